//! Résumé document model.
//!
//! The persisted shape is the camelCase JSON stored in `resumes.data`. `decode` is total:
//! any payload (including data written by earlier schema revisions) yields a structurally
//! valid `Document`. `encode` is the left inverse of `decode`.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error};
use uuid::Uuid;

use crate::models::user::UserProfile;

// ────────────────────────────────────────────────────────────────────────────
// Identifiers and enumerations
// ────────────────────────────────────────────────────────────────────────────

/// Stable identity of a custom section. Assigned once, never derived from position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(Uuid);

impl SectionId {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Visual template identifier. Unknown identifiers coerce to `Classic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum TemplateId {
    #[default]
    Classic,
    Modern,
    Creative,
}

impl TemplateId {
    pub const ALL: [TemplateId; 3] = [TemplateId::Classic, TemplateId::Modern, TemplateId::Creative];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::Classic => "classic",
            TemplateId::Modern => "modern",
            TemplateId::Creative => "creative",
        }
    }

    /// Exact match against the known identifiers, `Classic` otherwise.
    pub fn parse_or_default(raw: &str) -> Self {
        match raw {
            "classic" => TemplateId::Classic,
            "modern" => TemplateId::Modern,
            "creative" => TemplateId::Creative,
            _ => TemplateId::Classic,
        }
    }

    pub fn is_known(raw: &str) -> bool {
        matches!(raw, "classic" | "modern" | "creative")
    }
}

impl From<String> for TemplateId {
    fn from(raw: String) -> Self {
        TemplateId::parse_or_default(&raw)
    }
}

/// Custom section type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Project,
    Certification,
    Language,
    Generic,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Project,
        SectionKind::Certification,
        SectionKind::Language,
        SectionKind::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Project => "project",
            SectionKind::Certification => "certification",
            SectionKind::Language => "language",
            SectionKind::Generic => "generic",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        SectionKind::ALL.into_iter().find(|k| k.as_str() == raw)
    }
}

/// Language proficiency level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Proficiency {
    Native,
    Fluent,
    Advanced,
    #[default]
    Intermediate,
    Basic,
}

impl Proficiency {
    pub const ALL: [Proficiency; 5] = [
        Proficiency::Native,
        Proficiency::Fluent,
        Proficiency::Advanced,
        Proficiency::Intermediate,
        Proficiency::Basic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Proficiency::Native => "native",
            Proficiency::Fluent => "fluent",
            Proficiency::Advanced => "advanced",
            Proficiency::Intermediate => "intermediate",
            Proficiency::Basic => "basic",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Proficiency::ALL.into_iter().find(|p| p.as_str() == raw)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Records
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub first_name: String,
    pub last_name: String,
    /// Photo URI, empty when absent.
    pub photo: String,
    pub email: String,
    pub phone: String,
    pub position: String,
}

impl Identity {
    pub const FIELDS: [&'static str; 6] =
        ["firstName", "lastName", "photo", "email", "phone", "position"];

    pub fn field_mut(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "firstName" => Some(&mut self.first_name),
            "lastName" => Some(&mut self.last_name),
            "photo" => Some(&mut self.photo),
            "email" => Some(&mut self.email),
            "phone" => Some(&mut self.phone),
            "position" => Some(&mut self.position),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "firstName" => Some(&self.first_name),
            "lastName" => Some(&self.last_name),
            "photo" => Some(&self.photo),
            "email" => Some(&self.email),
            "phone" => Some(&self.phone),
            "position" => Some(&self.position),
            _ => None,
        }
    }

    /// "First Last", trimmed; empty when both parts are empty.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EducationEntry {
    pub institution: String,
    pub degree: String,
    pub year: String,
}

impl EducationEntry {
    pub const FIELDS: [&'static str; 3] = ["institution", "degree", "year"];

    pub fn field_mut(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "institution" => Some(&mut self.institution),
            "degree" => Some(&mut self.degree),
            "year" => Some(&mut self.year),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "institution" => Some(&self.institution),
            "degree" => Some(&self.degree),
            "year" => Some(&self.year),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub company: String,
    pub position: String,
    pub period: String,
    pub description: String,
}

impl ExperienceEntry {
    pub const FIELDS: [&'static str; 4] = ["company", "position", "period", "description"];

    pub fn field_mut(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "company" => Some(&mut self.company),
            "position" => Some(&mut self.position),
            "period" => Some(&mut self.period),
            "description" => Some(&mut self.description),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "company" => Some(&self.company),
            "position" => Some(&self.position),
            "period" => Some(&self.period),
            "description" => Some(&self.description),
            _ => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Custom sections
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSection {
    pub id: SectionId,
    pub title: String,
    pub description: String,
    pub technologies: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationSection {
    pub id: SectionId,
    pub name: String,
    pub organization: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSection {
    pub id: SectionId,
    pub language: String,
    pub proficiency: Proficiency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericSection {
    pub id: SectionId,
    pub title: String,
    pub content: String,
}

/// A user-added block, tagged by `type` in the persisted form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CustomSection {
    Project(ProjectSection),
    Certification(CertificationSection),
    Language(LanguageSection),
    Generic(GenericSection),
}

/// Why a custom-section field write was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRejection {
    /// The section type has no field with that name.
    Unknown,
    /// The field exists but the value is outside its domain.
    InvalidValue,
}

impl CustomSection {
    pub fn id(&self) -> SectionId {
        match self {
            CustomSection::Project(s) => s.id,
            CustomSection::Certification(s) => s.id,
            CustomSection::Language(s) => s.id,
            CustomSection::Generic(s) => s.id,
        }
    }

    pub fn kind(&self) -> SectionKind {
        match self {
            CustomSection::Project(_) => SectionKind::Project,
            CustomSection::Certification(_) => SectionKind::Certification,
            CustomSection::Language(_) => SectionKind::Language,
            CustomSection::Generic(_) => SectionKind::Generic,
        }
    }

    /// Reads a field by its persisted name. Proficiency is returned as its tag.
    pub fn field(&self, name: &str) -> Option<String> {
        let value: &str = match (self, name) {
            (CustomSection::Project(s), "title") => &s.title,
            (CustomSection::Project(s), "description") => &s.description,
            (CustomSection::Project(s), "technologies") => &s.technologies,
            (CustomSection::Project(s), "link") => &s.link,
            (CustomSection::Certification(s), "name") => &s.name,
            (CustomSection::Certification(s), "organization") => &s.organization,
            (CustomSection::Certification(s), "date") => &s.date,
            (CustomSection::Language(s), "language") => &s.language,
            (CustomSection::Language(s), "proficiency") => s.proficiency.as_str(),
            (CustomSection::Generic(s), "title") => &s.title,
            (CustomSection::Generic(s), "content") => &s.content,
            _ => return None,
        };
        Some(value.to_string())
    }

    pub fn set_field(&mut self, name: &str, value: &str) -> Result<(), FieldRejection> {
        if let (CustomSection::Language(s), "proficiency") = (&mut *self, name) {
            s.proficiency = Proficiency::parse(value).ok_or(FieldRejection::InvalidValue)?;
            return Ok(());
        }
        let slot = match (self, name) {
            (CustomSection::Project(s), "title") => &mut s.title,
            (CustomSection::Project(s), "description") => &mut s.description,
            (CustomSection::Project(s), "technologies") => &mut s.technologies,
            (CustomSection::Project(s), "link") => &mut s.link,
            (CustomSection::Certification(s), "name") => &mut s.name,
            (CustomSection::Certification(s), "organization") => &mut s.organization,
            (CustomSection::Certification(s), "date") => &mut s.date,
            (CustomSection::Language(s), "language") => &mut s.language,
            (CustomSection::Generic(s), "title") => &mut s.title,
            (CustomSection::Generic(s), "content") => &mut s.content,
            _ => return Err(FieldRejection::Unknown),
        };
        *slot = value.to_string();
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Document
// ────────────────────────────────────────────────────────────────────────────

/// The full in-memory résumé, owned by one editing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(flatten)]
    pub identity: Identity,
    /// Raw comma-separated skills; tokenized only when rendering.
    pub skills: String,
    pub education: Vec<EducationEntry>,
    pub experience: Vec<ExperienceEntry>,
    pub custom_sections: Vec<CustomSection>,
    pub template_id: TemplateId,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            identity: Identity::default(),
            skills: String::new(),
            education: vec![EducationEntry::default()],
            experience: vec![ExperienceEntry::default()],
            custom_sections: Vec::new(),
            template_id: TemplateId::Classic,
        }
    }
}

impl Document {
    /// A brand-new document with identity fields taken from the host profile.
    pub fn prefilled(profile: &UserProfile) -> Self {
        let mut document = Document::default();
        document.identity.first_name = profile.first_name.clone();
        document.identity.last_name = profile.last_name.clone();
        document.identity.photo = profile.avatar_uri.clone();
        document
    }

    pub fn section_ids(&self) -> Vec<SectionId> {
        self.custom_sections.iter().map(CustomSection::id).collect()
    }
}

/// Serializes a document into its persisted JSON form.
pub fn encode(document: &Document) -> Value {
    serde_json::to_value(document).unwrap_or_else(|e| {
        error!("Document serialization failed: {e}");
        Value::Object(Map::new())
    })
}

/// Decodes any JSON payload into a valid document. Never fails.
pub fn decode(raw: &Value) -> Document {
    let Some(obj) = raw.as_object() else {
        debug!("Document payload is not an object; using defaults");
        return Document::default();
    };

    let identity = Identity {
        first_name: text(obj, "firstName"),
        last_name: text(obj, "lastName"),
        photo: text(obj, "photo"),
        email: text(obj, "email"),
        phone: text(obj, "phone"),
        position: text(obj, "position"),
    };

    let education = match obj.get("education") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| EducationEntry {
                institution: text_in(item, "institution"),
                degree: text_in(item, "degree"),
                year: text_in(item, "year"),
            })
            .collect(),
        _ => vec![EducationEntry::default()],
    };

    let experience = match obj.get("experience") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| ExperienceEntry {
                company: text_in(item, "company"),
                position: text_in(item, "position"),
                period: text_in(item, "period"),
                description: text_in(item, "description"),
            })
            .collect(),
        _ => vec![ExperienceEntry::default()],
    };

    let template_id = obj
        .get("templateId")
        .or_else(|| obj.get("template"))
        .and_then(Value::as_str)
        .map(TemplateId::parse_or_default)
        .unwrap_or_default();

    Document {
        identity,
        skills: decode_skills(obj.get("skills")),
        education,
        experience,
        custom_sections: decode_sections(obj.get("customSections")),
        template_id,
    }
}

fn decode_skills(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        // Older revisions stored skills as a list of strings.
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(scalar_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => scalar_text(other).unwrap_or_default(),
        None => String::new(),
    }
}

fn decode_sections(value: Option<&Value>) -> Vec<CustomSection> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(obj) => Some(decode_section(obj, &mut seen)),
            Value::String(content) if !content.trim().is_empty() => {
                Some(CustomSection::Generic(GenericSection {
                    id: unique_id(None, &mut seen),
                    title: String::new(),
                    content: content.clone(),
                }))
            }
            _ => None,
        })
        .collect()
}

fn decode_section(obj: &Map<String, Value>, seen: &mut HashSet<SectionId>) -> CustomSection {
    let declared = obj.get("id").and_then(Value::as_str).and_then(SectionId::parse);
    let id = unique_id(declared, seen);
    let kind = obj.get("type").and_then(Value::as_str).and_then(SectionKind::parse);

    match kind {
        Some(SectionKind::Project) => CustomSection::Project(ProjectSection {
            id,
            title: text(obj, "title"),
            description: text(obj, "description"),
            technologies: text(obj, "technologies"),
            link: text(obj, "link"),
        }),
        Some(SectionKind::Certification) => CustomSection::Certification(CertificationSection {
            id,
            name: text(obj, "name"),
            organization: text(obj, "organization"),
            date: text(obj, "date"),
        }),
        Some(SectionKind::Language) => CustomSection::Language(LanguageSection {
            id,
            language: text(obj, "language"),
            proficiency: obj
                .get("proficiency")
                .and_then(Value::as_str)
                .and_then(Proficiency::parse)
                .unwrap_or_default(),
        }),
        Some(SectionKind::Generic) => CustomSection::Generic(GenericSection {
            id,
            title: text(obj, "title"),
            content: text(obj, "content"),
        }),
        None => {
            debug!(
                "Coercing custom section {id} with type {:?} to generic",
                obj.get("type")
            );
            CustomSection::Generic(GenericSection {
                id,
                title: first_populated(obj, &["title", "name", "language"]),
                content: first_populated(obj, &["content", "description"]),
            })
        }
    }
}

/// Keeps a declared id if it is new, otherwise allocates a fresh one.
fn unique_id(declared: Option<SectionId>, seen: &mut HashSet<SectionId>) -> SectionId {
    match declared {
        Some(id) if seen.insert(id) => id,
        _ => {
            let id = SectionId::fresh();
            seen.insert(id);
            id
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key).and_then(scalar_text).unwrap_or_default()
}

fn text_in(item: &Value, key: &str) -> String {
    item.as_object().map(|obj| text(obj, key)).unwrap_or_default()
}

fn first_populated(obj: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .map(|key| text(obj, key))
        .find(|value| !value.trim().is_empty())
        .unwrap_or_default()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
