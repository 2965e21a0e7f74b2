//! Section Registry: the fixed catalog of custom-section types.
//!
//! For every `SectionKind` the registry knows the ordered field schema shown by the
//! editor, how to allocate a fresh default section, and how to title a section in lists.

use serde::Serialize;

use crate::models::document::{
    CertificationSection, CustomSection, GenericSection, LanguageSection, Proficiency,
    ProjectSection, SectionId, SectionKind,
};

// ────────────────────────────────────────────────────────────────────────────
// Field schema
// ────────────────────────────────────────────────────────────────────────────

/// Input kind of a section field, used by editor UIs to pick a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Multiline,
    Url,
    Date,
    /// One of the `Proficiency` tags.
    Proficiency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub label: &'static str,
}

const fn spec(name: &'static str, kind: FieldKind, label: &'static str) -> FieldSpec {
    FieldSpec { name, kind, label }
}

static PROJECT_FIELDS: &[FieldSpec] = &[
    spec("title", FieldKind::Text, "Название проекта"),
    spec("description", FieldKind::Multiline, "Описание"),
    spec("technologies", FieldKind::Text, "Технологии"),
    spec("link", FieldKind::Url, "Ссылка"),
];

static CERTIFICATION_FIELDS: &[FieldSpec] = &[
    spec("name", FieldKind::Text, "Название сертификата"),
    spec("organization", FieldKind::Text, "Организация"),
    spec("date", FieldKind::Date, "Дата получения"),
];

static LANGUAGE_FIELDS: &[FieldSpec] = &[
    spec("language", FieldKind::Text, "Язык"),
    spec("proficiency", FieldKind::Proficiency, "Уровень владения"),
];

static GENERIC_FIELDS: &[FieldSpec] = &[
    spec("title", FieldKind::Text, "Название раздела"),
    spec("content", FieldKind::Multiline, "Содержание"),
];

/// Ordered field schema for a section type.
pub fn fields_for(kind: SectionKind) -> &'static [FieldSpec] {
    match kind {
        SectionKind::Project => PROJECT_FIELDS,
        SectionKind::Certification => CERTIFICATION_FIELDS,
        SectionKind::Language => LANGUAGE_FIELDS,
        SectionKind::Generic => GENERIC_FIELDS,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Defaults and titles
// ────────────────────────────────────────────────────────────────────────────

/// A freshly allocated, empty section of the given type with a new id.
pub fn defaults_for(kind: SectionKind) -> CustomSection {
    build(kind, SectionId::fresh(), String::new(), String::new())
}

/// Human label of a section type.
pub fn kind_label(kind: SectionKind) -> &'static str {
    match kind {
        SectionKind::Project => "Проект",
        SectionKind::Certification => "Сертификат",
        SectionKind::Language => "Язык",
        SectionKind::Generic => "Раздел",
    }
}

fn placeholder(kind: SectionKind) -> &'static str {
    match kind {
        SectionKind::Project => "Проект…",
        SectionKind::Certification => "Сертификат…",
        SectionKind::Language => "Язык…",
        SectionKind::Generic => "Раздел…",
    }
}

pub fn proficiency_label(proficiency: Proficiency) -> &'static str {
    match proficiency {
        Proficiency::Native => "Родной",
        Proficiency::Fluent => "Свободно",
        Proficiency::Advanced => "Продвинутый",
        Proficiency::Intermediate => "Средний",
        Proficiency::Basic => "Базовый",
    }
}

/// The most salient populated field of a section, or a per-type placeholder.
pub fn display_title(section: &CustomSection) -> String {
    let salient = primary_text(section).trim();
    if salient.is_empty() {
        placeholder(section.kind()).to_string()
    } else {
        salient.to_string()
    }
}

/// Title-like field of a section: title, name or language.
pub fn primary_text(section: &CustomSection) -> &str {
    match section {
        CustomSection::Project(s) => &s.title,
        CustomSection::Certification(s) => &s.name,
        CustomSection::Language(s) => &s.language,
        CustomSection::Generic(s) => &s.title,
    }
}

fn body_text(section: &CustomSection) -> &str {
    match section {
        CustomSection::Project(s) => &s.description,
        CustomSection::Generic(s) => &s.content,
        CustomSection::Certification(_) | CustomSection::Language(_) => "",
    }
}

/// Rebuilds a section as another type. The id is kept; the title-like field and the
/// free-text body carry over, type-specific fields do not.
pub fn convert(section: &CustomSection, kind: SectionKind) -> CustomSection {
    if section.kind() == kind {
        return section.clone();
    }
    build(
        kind,
        section.id(),
        primary_text(section).to_string(),
        body_text(section).to_string(),
    )
}

fn build(kind: SectionKind, id: SectionId, primary: String, body: String) -> CustomSection {
    match kind {
        SectionKind::Project => CustomSection::Project(ProjectSection {
            id,
            title: primary,
            description: body,
            technologies: String::new(),
            link: String::new(),
        }),
        SectionKind::Certification => CustomSection::Certification(CertificationSection {
            id,
            name: primary,
            organization: String::new(),
            date: String::new(),
        }),
        SectionKind::Language => CustomSection::Language(LanguageSection {
            id,
            language: primary,
            proficiency: Proficiency::default(),
        }),
        SectionKind::Generic => CustomSection::Generic(GenericSection {
            id,
            title: primary,
            content: body,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_schema_field_is_addressable() {
        for kind in SectionKind::ALL {
            let mut section = defaults_for(kind);
            for field in fields_for(kind) {
                assert!(
                    section.field(field.name).is_some(),
                    "{} missing readable field {}",
                    kind.as_str(),
                    field.name
                );
                let value = match field.kind {
                    FieldKind::Proficiency => "fluent",
                    _ => "value",
                };
                assert!(section.set_field(field.name, value).is_ok());
            }
        }
    }

    #[test]
    fn test_defaults_have_fresh_ids() {
        let a = defaults_for(SectionKind::Project);
        let b = defaults_for(SectionKind::Project);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.kind(), SectionKind::Project);
    }

    #[test]
    fn test_language_schema_order() {
        let names: Vec<_> = fields_for(SectionKind::Language).iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["language", "proficiency"]);
    }

    #[test]
    fn test_display_title_placeholder_when_empty() {
        assert_eq!(display_title(&defaults_for(SectionKind::Project)), "Проект…");
        assert_eq!(display_title(&defaults_for(SectionKind::Generic)), "Раздел…");
    }

    #[test]
    fn test_display_title_uses_salient_field() {
        let mut cert = defaults_for(SectionKind::Certification);
        cert.set_field("organization", "Coursera").unwrap();
        assert_eq!(display_title(&cert), "Сертификат…");
        cert.set_field("name", "  AWS Solutions Architect ").unwrap();
        assert_eq!(display_title(&cert), "AWS Solutions Architect");

        let mut lang = defaults_for(SectionKind::Language);
        lang.set_field("language", "English").unwrap();
        assert_eq!(display_title(&lang), "English");
    }

    #[test]
    fn test_convert_keeps_id_and_carries_text() {
        let mut project = defaults_for(SectionKind::Project);
        project.set_field("title", "Compiler").unwrap();
        project.set_field("description", "Toy language").unwrap();
        project.set_field("link", "https://example.com").unwrap();

        let generic = convert(&project, SectionKind::Generic);
        assert_eq!(generic.id(), project.id());
        assert_eq!(generic.field("title").as_deref(), Some("Compiler"));
        assert_eq!(generic.field("content").as_deref(), Some("Toy language"));

        let cert = convert(&generic, SectionKind::Certification);
        assert_eq!(cert.field("name").as_deref(), Some("Compiler"));
        assert_eq!(cert.field("organization").as_deref(), Some(""));
    }

    #[test]
    fn test_convert_same_kind_is_identity() {
        let mut lang = defaults_for(SectionKind::Language);
        lang.set_field("proficiency", "native").unwrap();
        assert_eq!(convert(&lang, SectionKind::Language), lang);
    }
}
