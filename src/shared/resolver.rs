//! Turns one user input into the user bubble and the bot reply that follows it.

use super::catalog::{Catalog, CourseAliases};
use super::matcher::Matcher;
use super::models::{CourseRecord, HandOff, KnowledgeRecord, QuickAction};
use std::sync::Arc;
use tracing::debug;

/// Chat input of the form `course:<key>` selects a course directly.
pub const COURSE_PREFIX: &str = "course:";

const GREETING: &str = "Assalomu alaykum! 👋\nMen Alouddin_Talim_Markazi yordamchi botiman.\nSizga qanday yordam bera olaman?";
const FALLBACK: &str =
    "Kechirasiz, savolingizni tushunmadim. Iltimos, quyidagi variantlardan birini tanlang 👇";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyKind {
    Course { id: String },
    Knowledge { id: String },
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Text shown in the user's bubble.
    pub user_text: String,
    pub bot_text: String,
    pub options: Vec<QuickAction>,
    pub kind: ReplyKind,
}

#[derive(Debug, Clone)]
pub struct Resolver {
    knowledge: Arc<[KnowledgeRecord]>,
    courses: CourseAliases,
    matcher: Matcher,
}

impl Resolver {
    pub fn new(catalog: &Catalog, matcher: Matcher) -> Self {
        Self {
            knowledge: catalog.knowledge.clone(),
            courses: catalog.aliases(),
            matcher,
        }
    }

    pub fn greeting(&self) -> (String, Vec<QuickAction>) {
        (
            GREETING.to_string(),
            vec![
                QuickAction::query("Kurslar", "kurslar"),
                QuickAction::open_modal("Bepul konsultatsiya", None),
            ],
        )
    }

    pub fn resolve(&self, input: &str) -> Resolution {
        if let Some(course) = self.find_course(input) {
            debug!("Resolved {:?} as course {}", input, course.id);
            return course_reply(course);
        }

        match self.matcher.best_match(input, &self.knowledge) {
            Some(record) => knowledge_reply(input, record),
            None => {
                debug!("No knowledge record matched {:?}", input);
                Resolution {
                    user_text: input.to_string(),
                    bot_text: FALLBACK.to_string(),
                    options: vec![
                        QuickAction::query("Barcha kurslar", "kurslar"),
                        QuickAction::query("Manzilimiz", "manzil"),
                    ],
                    kind: ReplyKind::Fallback,
                }
            }
        }
    }

    /// A known `course:<key>` sentinel, or free text equal to a course name.
    /// Unknown sentinel keys fall through to general matching.
    fn find_course(&self, input: &str) -> Option<&CourseRecord> {
        match input.strip_prefix(COURSE_PREFIX) {
            Some(key) => self.courses.get(key),
            None => self.courses.find_by_name(input),
        }
    }
}

/// The "view more" chip targets the course's own anchor (`kurs-ingliz-tili`),
/// not the alias key the user picked (`ielts`), since only the former exists on the page.
fn course_reply(course: &CourseRecord) -> Resolution {
    Resolution {
        user_text: course.name.clone(),
        bot_text: format!(
            "Siz {} haqida ma'lumot tanladingiz. {}",
            course.name, course.description
        ),
        options: vec![
            QuickAction::scroll("Batafsil ko'rish", &course.anchor()),
            QuickAction::open_modal("Konsultatsiya", Some(&course.name)),
        ],
        kind: ReplyKind::Course {
            id: course.id.clone(),
        },
    }
}

fn knowledge_reply(input: &str, record: &KnowledgeRecord) -> Resolution {
    let mut options = record.actions.clone();
    if let Some(HandOff::Consultation) = record.hand_off {
        options.push(QuickAction::open_modal("Ro'yxatdan o'tish", None));
    }

    Resolution {
        user_text: input.to_string(),
        bot_text: record.details.clone(),
        options,
        kind: ReplyKind::Knowledge {
            id: record.id.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::Action;

    fn resolver() -> Resolver {
        Resolver::new(&Catalog::builtin(), Matcher::default())
    }

    #[test]
    fn test_course_sentinel_uses_alias() {
        let reply = resolver().resolve("course:ielts");
        assert_eq!(reply.user_text, "Ingliz tili");
        assert_eq!(
            reply.bot_text,
            "Siz Ingliz tili haqida ma'lumot tanladingiz. \
             Xalqaro imkoniyatlar eshigini oching va dunyo bilan erkin muloqot qiling."
        );
        assert_eq!(reply.options.len(), 2);
        assert_eq!(
            reply.options[0].action,
            Action::Scroll {
                anchor: "kurs-ingliz-tili".to_string()
            }
        );
        assert_eq!(
            reply.options[1].action,
            Action::OpenModal {
                subject: Some("Ingliz tili".to_string())
            }
        );
    }

    #[test]
    fn test_course_name_typed_in_full() {
        let reply = resolver().resolve("KIMYO");
        assert_eq!(reply.kind, ReplyKind::Course { id: "kimyo".to_string() });
        assert_eq!(reply.user_text, "Kimyo");
    }

    #[test]
    fn test_unknown_sentinel_falls_through() {
        let reply = resolver().resolve("course:astronomiya");
        assert_eq!(reply.user_text, "course:astronomiya");
        // "kurs" keyword is not contained, "course" is not a keyword either
        assert_eq!(reply.kind, ReplyKind::Fallback);
    }

    #[test]
    fn test_hand_off_appends_external_registration() {
        let reply = resolver().resolve("bepul konsultatsiya kerak");
        assert_eq!(
            reply.kind,
            ReplyKind::Knowledge {
                id: "konsultatsiya".to_string()
            }
        );
        let last = reply.options.last().unwrap();
        assert_eq!(last.label, "Ro'yxatdan o'tish");
        assert_eq!(last.action, Action::OpenModal { subject: None });
    }

    #[test]
    fn test_knowledge_reply_echoes_details_and_actions() {
        let reply = resolver().resolve("manzil qayerda");
        assert_eq!(reply.kind, ReplyKind::Knowledge { id: "manzil".to_string() });
        assert!(reply.bot_text.contains("+998 93 008 67 66"));
        assert_eq!(reply.options, vec![QuickAction::scroll("Xaritada ko'rsatish", "aloqa")]);
    }

    #[test]
    fn test_fallback_offers_two_chips() {
        let reply = resolver().resolve("zzz-unknown-zzz");
        assert_eq!(reply.kind, ReplyKind::Fallback);
        assert_eq!(reply.options.len(), 2);
    }
}
