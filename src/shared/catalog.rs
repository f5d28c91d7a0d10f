//! Built-in reference data: the course catalog, the assistant's knowledge table
//! and the site search table. Tables are built once and never mutated.

use super::models::{Action, CourseRecord, HandOff, KnowledgeRecord, QuickAction, SearchRecord};
use once_cell::sync::Lazy;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Courses exposed to the assistant under a key other than their own id.
pub const COURSE_ALIASES: &[(&str, &str)] = &[("ingliz-tili", "ielts")];

const COURSES: &[(&str, &str, &str, &str)] = &[
    (
        "ingliz-tili",
        "Ingliz tili",
        "Xalqaro imkoniyatlar eshigini oching va dunyo bilan erkin muloqot qiling.",
        "LanguagesIcon",
    ),
    (
        "rus-tili",
        "Rus tili",
        "Ikkinchi xorijiy tilni o‘rganing va o‘z imkoniyatlaringizni yanada kengaytiring.",
        "MessageCircleIcon",
    ),
    (
        "koreys-tili",
        "Koreys tili",
        "Zamonaviy koreys tilini o‘rganing va xalqaro imkoniyatlarga yo‘l oching.",
        "TranslateIcon",
    ),
    (
        "xitoy-tili",
        "Xitoy tili",
        "Dunyoning eng talabgir tillaridan birini o‘rganib, global muloqotga chiqing.",
        "TranslateIcon",
    ),
    (
        "ona-tili",
        "Ona tili",
        "O‘z ona tilingizni mukammal o‘rganing va imtihonlarga tayyorlaning.",
        "BookOpenIcon",
    ),
    (
        "tarix",
        "Tarix",
        "O‘tmishni o‘rganib, kelajakni anglang va dunyoqarashingizni kengaytiring.",
        "ScrollIcon",
    ),
    (
        "pochemuchka",
        "Pochemuchka",
        "Farzandingizning qiziquvchanligini rag'batlantiring va dunyoni kashf eting.",
        "LightbulbIcon",
    ),
    (
        "mental-arifmetika",
        "Mental arifmetika",
        "Tezkor hisoblash ko'nikmalarini rivojlantiring va aqliy salohiyatni kuchaytiring.",
        "CalculatorIcon",
    ),
    (
        "kompyuter-savodxonligi",
        "Kompyuter savodxonligi",
        "Ofis dasturlari va internetdan samarali foydalanishni o‘rganing.",
        "MonitorIcon",
    ),
    (
        "backend",
        "Backend dasturlash",
        "Server, ma’lumotlar bazasi va API bilan ishlashni professional o‘rganing.",
        "CodeIcon",
    ),
    (
        "kimyo",
        "Kimyo",
        "Kimyo fanidan mustahkam bilim olib, testlar va imtihonlarga puxta tayyorlaning.",
        "FlaskConicalIcon",
    ),
    (
        "biologiya",
        "Biologiya",
        "Biologiya fanini chuqur o‘rganib, tirik organizmlar va hayot jarayonlarini tushuning.",
        "DnaIcon",
    ),
];

/// (knowledge id, course id, title, keywords)
const COURSE_TOPICS: &[(&str, &str, &str, &[&str])] = &[
    (
        "ielts",
        "ingliz-tili",
        "Ingliz tili (IELTS) kursi",
        &["ielts", "ingliz tili", "english", "grammar", "speaking"],
    ),
    ("rus-tili", "rus-tili", "Rus tili kursi", &["rus tili", "russian", "ruscha"]),
    (
        "koreys-tili",
        "koreys-tili",
        "Koreys tili kursi",
        &["koreys tili", "korean", "koreyscha"],
    ),
    (
        "xitoy-tili",
        "xitoy-tili",
        "Xitoy tili kursi",
        &["xitoy tili", "chinese", "xitoycha"],
    ),
    ("ona-tili", "ona-tili", "Ona tili kursi", &["ona tili", "uzbek tili", "ona til"]),
    ("tarix", "tarix", "Tarix kursi", &["tarix", "history", "o'tmish"]),
    (
        "pochemuchka",
        "pochemuchka",
        "Pochemuchka kursi",
        &["pochemuchka", "qiziquvchanlik", "bolalar"],
    ),
    (
        "mental-arifmetika",
        "mental-arifmetika",
        "Mental arifmetika kursi",
        &["mental arifmetika", "hisoblash", "aql"],
    ),
    (
        "kompyuter-savodxonligi",
        "kompyuter-savodxonligi",
        "Kompyuter savodxonligi kursi",
        &["kompyuter savodxonligi", "computer", "ofis dasturlari"],
    ),
    (
        "backend",
        "backend",
        "Backend dasturlash kursi",
        &["backend", "dasturlash", "programming", "server"],
    ),
    ("kimyo", "kimyo", "Kimyo kursi", &["kimyo", "chemistry", "kimyoviy reaksiyalar"]),
    (
        "biologiya",
        "biologiya",
        "Biologiya kursi",
        &["biologiya", "biology", "tirik organizmlar"],
    ),
];

static BUILTIN: Lazy<Catalog> = Lazy::new(Catalog::build);

/// Lookup from assistant course key to course record.
///
/// Keys are course ids except where [`COURSE_ALIASES`] renames them.
#[derive(Debug, Clone)]
pub struct CourseAliases {
    entries: Vec<(String, CourseRecord)>,
}

impl CourseAliases {
    pub fn new(courses: &[CourseRecord], aliases: &[(&str, &str)]) -> Self {
        let entries = courses
            .iter()
            .map(|course| {
                let key = aliases
                    .iter()
                    .find(|(id, _)| *id == course.id)
                    .map(|(_, alias)| alias.to_string())
                    .unwrap_or_else(|| course.id.clone());
                (key, course.clone())
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&CourseRecord> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, course)| course)
    }

    /// Case-insensitive exact match of `text` against course display names.
    pub fn find_by_name(&self, text: &str) -> Option<&CourseRecord> {
        let lower = text.to_lowercase();
        self.entries
            .iter()
            .find(|(_, course)| course.name.to_lowercase() == lower)
            .map(|(_, course)| course)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CourseRecord)> {
        self.entries.iter().map(|(k, c)| (k.as_str(), c))
    }
}

/// The immutable tables shared by the assistant and site search.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub courses: Arc<[CourseRecord]>,
    pub knowledge: Arc<[KnowledgeRecord]>,
    pub search: Arc<[SearchRecord]>,
}

impl Catalog {
    /// Shared handle to the built-in tables.
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    pub fn aliases(&self) -> CourseAliases {
        CourseAliases::new(&self.courses, COURSE_ALIASES)
    }

    /// Every anchor the tables point at; the page is expected to expose them.
    pub fn anchors(&self) -> BTreeSet<String> {
        let mut anchors = BTreeSet::new();
        for record in self.knowledge.iter() {
            anchors.extend(record.target_id.iter().cloned());
            for chip in &record.actions {
                if let Action::Scroll { anchor } = &chip.action {
                    anchors.insert(anchor.clone());
                }
            }
        }
        anchors.extend(self.search.iter().map(|r| r.target_id.clone()));
        anchors.extend(self.courses.iter().map(CourseRecord::anchor));
        anchors
    }

    fn build() -> Self {
        let courses = builtin_courses();
        let knowledge = build_knowledge(&courses);
        let search = build_search(&courses);
        Self {
            courses: courses.into(),
            knowledge: knowledge.into(),
            search: search.into(),
        }
    }
}

fn builtin_courses() -> Vec<CourseRecord> {
    COURSES
        .iter()
        .map(|(id, name, description, icon)| CourseRecord {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
        })
        .collect()
}

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_lowercase()).collect()
}

fn info(id: &str, title: &str, category: &str, words: &[&str], details: &str) -> KnowledgeRecord {
    KnowledgeRecord {
        id: id.to_string(),
        title: title.to_string(),
        category: category.to_string(),
        keywords: keywords(words),
        details: details.to_string(),
        target_id: None,
        actions: Vec::new(),
        hand_off: None,
    }
}

fn build_knowledge(courses: &[CourseRecord]) -> Vec<KnowledgeRecord> {
    let mut table = Vec::new();

    let mut greeting = info(
        "salom",
        "Salomlashish",
        "Umumiy",
        &["salom", "assalomu alaykum", "xayrli kun", "yaxshimisiz", "qaleysiz"],
        "Assalomu alaykum! 👋 Sizga qanday yordam bera olaman?",
    );
    greeting.actions = vec![
        QuickAction::query("Kurslar haqida", "kurslar"),
        QuickAction::query("Manzilimiz", "manzil"),
    ];
    table.push(greeting);

    let mut consultation = info(
        "konsultatsiya",
        "Bepul konsultatsiya",
        "Umumiy",
        &[
            "konsultatsiya",
            "bepul",
            "yozilish",
            "ro'yxatdan o'tish",
            "maslahat",
            "ariza",
            "ro'yxat",
        ],
        "Albatta! Bepul konsultatsiyaga yozilish uchun, iltimos, quyidagi formani to'ldiring. \
         Menejerlarimiz tez orada siz bilan bog'lanishadi. 👇",
    );
    consultation.hand_off = Some(HandOff::Consultation);
    table.push(consultation);

    let mut all_courses = info(
        "kurslar",
        "Barcha kurslar",
        "Fanlar",
        &["kurslar", "fanlar", "qanaqa kurslar bor", "o'qish", "kurs"],
        "Bizda quyidagi kurslar mavjud. Qaysi biri haqida batafsil ma'lumot kerak?",
    );
    let aliases = CourseAliases::new(courses, COURSE_ALIASES);
    all_courses.actions = aliases
        .iter()
        .map(|(key, course)| {
            let label = if key == course.id {
                course.name.clone()
            } else {
                format!("{} ({})", course.name, key.to_uppercase())
            };
            QuickAction::query(&label, &format!("course:{key}"))
        })
        .collect();
    table.push(all_courses);

    let mut prices = info(
        "narxlar",
        "Narxlar",
        "Ma'lumot",
        &["narx", "narxlar", "to'lov", "qancha", "pul"],
        "Kurslarimiz narxlari yo'nalishga qarab farq qiladi:\n\n\
         • Fanlar (Matematika, Fizika): 450,000 so'm/oy\n\
         • Ingliz tili: 550,000 so'm/oy\n\
         • IT kurslari: 600,000 so'm/oy\n\n\
         To'lovlar uchun chegirmalarimiz ham mavjud!",
    );
    prices.actions = vec![QuickAction::query("Konsultatsiya olish", "konsultatsiya")];
    table.push(prices);

    for (id, course_id, title, words) in COURSE_TOPICS {
        let Some(course) = courses.iter().find(|c| c.id == *course_id) else {
            continue;
        };
        let anchor = course.anchor();
        let mut topic = info(id, title, "Fanlar", words, &course.description);
        topic.target_id = Some(anchor.clone());
        topic.actions = vec![
            QuickAction::scroll("Batafsil ko'rish", &anchor),
            QuickAction::query("Ro'yxatdan o'tish", "konsultatsiya"),
        ];
        table.push(topic);
    }

    let mut address = info(
        "manzil",
        "Manzil va Aloqa",
        "Ma'lumot",
        &["manzil", "adres", "qayerda", "telefon", "kontakt", "aloqa", "ish vaqti"],
        "📍Bizning manzil: Toshkent viloyati, Yuqorichirchiq tumani, Yangibozor shaharchasi, \
         Mustaqillik ko‘chasi\n📞 Telefon: +998 93 008 67 66\n⏰ Ish vaqti: 09:00 - 19:00 (Du-Sha)",
    );
    address.target_id = Some("aloqa".to_string());
    address.actions = vec![QuickAction::scroll("Xaritada ko'rsatish", "aloqa")];
    table.push(address);

    table
}

fn page_entry(
    title: &str,
    category: &str,
    words: &[&str],
    description: &str,
    target_id: &str,
) -> SearchRecord {
    SearchRecord {
        title: title.to_string(),
        category: category.to_string(),
        keywords: keywords(words),
        description: description.to_string(),
        target_id: target_id.to_string(),
        is_active: true,
    }
}

/// Keywords for a course: the full lower-cased name plus each of its words.
pub fn course_keywords(name: &str) -> Vec<String> {
    let lower = name.to_lowercase();
    let mut words = vec![lower.clone()];
    words.extend(lower.split_whitespace().map(str::to_string));
    words
}

fn build_search(courses: &[CourseRecord]) -> Vec<SearchRecord> {
    let mut table: Vec<SearchRecord> = courses
        .iter()
        .map(|course| SearchRecord {
            title: course.name.clone(),
            category: "Fanlar".to_string(),
            keywords: course_keywords(&course.name),
            description: course.description.clone(),
            target_id: course.anchor(),
            is_active: true,
        })
        .collect();

    table.push(page_entry(
        "Biz haqimizda",
        "Ma'lumot",
        &["biz haqimizda", "markaz haqida", "nega biz", "afzalliklar"],
        "Bizning yondashuvimiz har bir o'quvchining shaxsiy salohiyatini to'liq ochishga qaratilgan.",
        "biz-haqimizda",
    ));
    table.push(page_entry(
        "Manzillarimiz",
        "Kontakt",
        &["manzil", "adres", "filial", "joylashuv", "qayerda"],
        "Bizning filiallarimiz manzillari va joylashuvi haqida ma'lumot.",
        "manzillarimiz",
    ));
    table.push(page_entry(
        "Vakansiyalar",
        "Karyera",
        &["vakansiya", "ish", "ishga kirish", "jamoa", "bo'sh ish o'rni"],
        "Bizning jamoamizga qo'shiling! O'qituvchi, menejer va boshqa ochiq vakansiyalar.",
        "vacancies",
    ));
    table.push(page_entry(
        "Statistika va Natijalar",
        "Ma'lumot",
        &["natija", "statistika", "kafolat", "ishonch", "tajriba"],
        "10,000+ o'quvchi ishonchi, 98% kafolatlangan natija, 15+ yillik tajriba.",
        "yangiliklar",
    ));
    table.push(page_entry(
        "Aloqa ma'lumotlari",
        "Aloqa",
        &["aloqa", "telefon", "manzil", "kontakt", "bog'lanish"],
        "Telefon raqam: +998 93 008 67 66. Manzil: Toshkent sh., Yunusobod tumani, A.Temur ko'ch., 123-uy.",
        "aloqa",
    ));
    table.push(page_entry(
        "Kursga yozilish",
        "Aloqa",
        &["kursga yozilish", "ro'yxatdan o'tish", "konsultatsiya", "ariza"],
        "Bepul konsultatsiya olish yoki kursga yozilish uchun ariza qoldiring.",
        "home",
    ));

    table
}
