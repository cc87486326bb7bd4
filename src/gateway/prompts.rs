//! Prompt and system-instruction builders (Arabic).

use crate::profile::{Gender, UserProfile};

const BASE_INSTRUCTION: &str =
    "أنت مساعد ذكي في تطبيق 'EcoSmart' للوعي البيئي. اسمك 'إيكو بوت'. تحدث باللغة العربية.";

/// System instruction for chat turns, personalised when a profile is present.
#[must_use]
pub fn system_instruction(profile: Option<&UserProfile>) -> String {
    let mut instruction = BASE_INSTRUCTION.to_owned();
    if let Some(profile) = profile {
        let address_form = match profile.gender {
            Gender::Male => "صيغة المذكر",
            Gender::Female => "صيغة المؤنث",
        };
        instruction.push_str(&format!(
            " المستخدم اسمه \"{name}\". خاطبه ب{address_form}.\n\
             موقع المستخدم الحالي هو: {city}, {country}.\n\
             استخدم معلومات الموقع لتقديم نصائح بيئية ومناخية دقيقة تناسب منطقته.\n\
             اجعل إجاباتك ودودة، مشجعة، ومختصرة.",
            name = profile.name,
            city = profile.city,
            country = profile.country,
        ));
    }
    instruction
}

/// Climate summary request bounded to roughly 40 words.
#[must_use]
pub fn weather_prompt(profile: &UserProfile) -> String {
    format!(
        "قم بإنشاء تقرير مناخي موجز جداً (أقل من 40 كلمة) لمدينة {city} في دولة {country} لهذا الوقت من السنة.\n\
         توقع حالة الطقس العامة (درجة الحرارة التقريبية) وقدم نصيحة بيئية واحدة تناسب هذا الجو.",
        city = profile.city,
        country = profile.country,
    )
}

/// Practical-ideas request for `topic`.
#[must_use]
pub fn advice_prompt(topic: &str, profile: Option<&UserProfile>) -> String {
    let mut prompt =
        format!("أنا طالب مهتم بالبيئة. أريد أن أكتب موضوعاً أو أنفذ مشروعاً حول: \"{topic}\".");
    if let Some(profile) = profile {
        prompt.push_str(&format!(
            " أعيش في {}, {}. اجعل النصائح مناسبة لبيئتي المحلية.",
            profile.city, profile.country
        ));
    }
    prompt.push_str(" قم بتوليد قائمة من الأفكار العملية والنصائح المبتكرة.");
    prompt
}
