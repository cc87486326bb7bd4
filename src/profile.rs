//! User profile: identity and location used to personalise AI responses.
//!
//! A [`UserProfile`] is created once at onboarding from a [`ProfileDraft`],
//! persisted by the [`ProfileStore`] as JSON under a fixed key, and shared
//! read-only with every component that personalises requests.

use crate::error::{EcoError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Fixed storage key (file name) for the persisted profile.
pub const PROFILE_STORAGE_KEY: &str = "eco_user_profile.json";

/// Catalog entry used when the user's country is not listed.
pub const OTHER_COUNTRY: &str = "أخرى";

/// Countries offered at onboarding with their cities.
pub const LOCATIONS: &[(&str, &[&str])] = &[
    (
        "المملكة العربية السعودية",
        &[
            "الرياض",
            "جدة",
            "مكة المكرمة",
            "المدينة المنورة",
            "الدمام",
            "الخبر",
            "أبها",
            "تبوك",
            "حائل",
            "جازان",
            "نجران",
            "بريدة",
            "الهفوف",
        ],
    ),
    (
        "الإمارات العربية المتحدة",
        &["دبي", "أبو ظبي", "الشارقة", "عجمان", "رأس الخيمة", "الفجيرة", "أم القيوين"],
    ),
    (
        "مصر",
        &[
            "القاهرة",
            "الإسكندرية",
            "الجيزة",
            "شرم الشيخ",
            "الغردقة",
            "الأقصر",
            "أسوان",
            "المنصورة",
            "طنطا",
        ],
    ),
    ("الأردن", &["عمان", "إربد", "الزرقاء", "العقبة", "السلط", "مادبا"]),
    (
        "الكويت",
        &["مدينة الكويت", "حولي", "السالمية", "الجهراء", "الفروانية", "الأحمدي"],
    ),
    ("قطر", &["الدوحة", "الريان", "الوكرة", "الخور"]),
    ("البحرين", &["المنامة", "المحرق", "الرفاع", "مدينة حمد", "مدينة عيسى"]),
    ("سلطنة عمان", &["مسقط", "صلالة", "صحار", "نزوى", "صور"]),
    ("العراق", &["بغداد", "البصرة", "الموصل", "أربيل", "النجف", "كربلاء"]),
    ("المغرب", &["الدار البيضاء", "الرباط", "مراكش", "فاس", "طنجة", "أغادير"]),
    (OTHER_COUNTRY, &["مدينة أخرى"]),
];

/// Cities listed for `country`, or `None` when the country is not in the catalog.
#[must_use]
pub fn cities_for(country: &str) -> Option<&'static [&'static str]> {
    LOCATIONS
        .iter()
        .find(|(name, _)| *name == country)
        .map(|(_, cities)| *cities)
}

/// Grammatical gender used for address form and voice selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Gender {
    /// Parse `male`/`female` (case-insensitive) or their Arabic equivalents.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "male" | "m" | "ذكر" => Some(Self::Male),
            "female" | "f" | "أنثى" => Some(Self::Female),
            _ => None,
        }
    }
}

/// The user's self-reported identity and location. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub gender: Gender,
    pub country: String,
    pub city: String,
}

/// Onboarding input, validated into a [`UserProfile`].
#[derive(Debug, Clone, Default)]
pub struct ProfileDraft {
    pub name: String,
    pub gender: Gender,
    pub country: String,
    pub city: String,
}

impl ProfileDraft {
    /// Validate the draft and build the profile.
    ///
    /// The name must contain non-whitespace characters; country and city are
    /// required. Countries outside the catalog are accepted as free text.
    ///
    /// # Errors
    ///
    /// Returns [`EcoError::Profile`] naming the first missing field.
    pub fn build(self) -> Result<UserProfile> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(EcoError::Profile("name is required".into()));
        }
        let country = self.country.trim();
        if country.is_empty() {
            return Err(EcoError::Profile("country is required".into()));
        }
        let city = self.city.trim();
        if city.is_empty() {
            return Err(EcoError::Profile("city is required".into()));
        }
        if let Some(cities) = cities_for(country)
            && country != OTHER_COUNTRY
            && !cities.contains(&city)
        {
            warn!("city {city:?} is not listed for {country:?}, accepting as entered");
        }

        Ok(UserProfile {
            name: name.to_owned(),
            gender: self.gender,
            country: country.to_owned(),
            city: city.to_owned(),
        })
    }
}

/// JSON file persistence for the single user profile.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    /// Store rooted at `dir`, using the fixed [`PROFILE_STORAGE_KEY`].
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(PROFILE_STORAGE_KEY),
        }
    }

    /// Store in the application data directory.
    pub fn in_data_dir() -> Self {
        Self::new(crate::app_dirs::data_dir())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted profile. A missing file means "not onboarded".
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<UserProfile>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let profile = serde_json::from_str(&content)?;
        Ok(Some(profile))
    }

    /// Persist `profile`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, profile: &UserProfile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(profile)?;
        std::fs::write(&self.path, content)?;
        info!("profile saved to {}", self.path.display());
        Ok(())
    }

    /// Delete the persisted profile (logout). Missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("profile removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
