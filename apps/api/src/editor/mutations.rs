//! Mutation Engine: one synchronous operation per editable axis of a `Document`.
//!
//! Every operation mutates the document in place and returns an `Outcome`. Refusals
//! (out-of-range index, cardinality floor, boundary move, unknown field) leave the
//! document untouched and carry a user-facing tip. Nothing here performs I/O.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::document::{
    Document, EducationEntry, ExperienceEntry, FieldRejection, SectionKind, TemplateId,
};
use crate::sections::registry;

// ────────────────────────────────────────────────────────────────────────────
// Addressing
// ────────────────────────────────────────────────────────────────────────────

/// The three ordered lists of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListName {
    Education,
    Experience,
    CustomSections,
}

impl ListName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListName::Education => "education",
            ListName::Experience => "experience",
            ListName::CustomSections => "customSections",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "education" => Some(ListName::Education),
            "experience" => Some(ListName::Experience),
            "customSections" => Some(ListName::CustomSections),
            _ => None,
        }
    }

    /// Lists that must keep at least one entry.
    pub fn has_floor(&self) -> bool {
        matches!(self, ListName::Education | ListName::Experience)
    }
}

impl fmt::Display for ListName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Up => "up",
            Direction::Down => "down",
        })
    }
}

/// One segment of a JSON field path such as `["customSections", 0, "language"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

/// Address of a single editable string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PathSegment>", into = "Vec<PathSegment>")]
pub enum FieldPath {
    /// Identity field, `skills` or `templateId`.
    Top(String),
    Entry {
        list: ListName,
        index: usize,
        field: String,
    },
}

impl FieldPath {
    pub fn top(field: &str) -> Self {
        FieldPath::Top(field.to_string())
    }

    pub fn entry(list: ListName, index: usize, field: &str) -> Self {
        FieldPath::Entry {
            list,
            index,
            field: field.to_string(),
        }
    }

    /// Name of the addressed field, without the list prefix.
    pub fn field_name(&self) -> &str {
        match self {
            FieldPath::Top(field) | FieldPath::Entry { field, .. } => field,
        }
    }

    /// False for fields restricted to a fixed set of values.
    pub fn is_free_text(&self) -> bool {
        match self {
            FieldPath::Top(field) => field != "templateId",
            FieldPath::Entry { field, .. } => field != "proficiency",
        }
    }
}

impl TryFrom<Vec<PathSegment>> for FieldPath {
    type Error = String;

    fn try_from(segments: Vec<PathSegment>) -> Result<Self, Self::Error> {
        match segments.as_slice() {
            [PathSegment::Key(field)] => Ok(FieldPath::Top(field.clone())),
            [PathSegment::Key(list), PathSegment::Index(index), PathSegment::Key(field)] => {
                let list = ListName::parse(list).ok_or_else(|| format!("unknown list '{list}'"))?;
                Ok(FieldPath::Entry {
                    list,
                    index: *index,
                    field: field.clone(),
                })
            }
            _ => Err("field path must be [field] or [list, index, field]".to_string()),
        }
    }
}

impl From<FieldPath> for Vec<PathSegment> {
    fn from(path: FieldPath) -> Self {
        match path {
            FieldPath::Top(field) => vec![PathSegment::Key(field)],
            FieldPath::Entry { list, index, field } => vec![
                PathSegment::Key(list.as_str().to_string()),
                PathSegment::Index(index),
                PathSegment::Key(field),
            ],
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Outcomes
// ────────────────────────────────────────────────────────────────────────────

/// Why an operation left the document unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Refusal {
    #[error("index {index} is out of range for {list} (length {len})")]
    IndexOutOfRange {
        list: ListName,
        index: usize,
        len: usize,
    },

    #[error("{list} must keep at least one entry")]
    MinimumCardinality { list: ListName },

    #[error("section {index} cannot move {direction}")]
    AtBoundary { index: usize, direction: Direction },

    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    #[error("'{value}' is not a valid value for '{field}'")]
    InvalidValue { field: String, value: String },

    #[error("'{field}' was removed before the write completed")]
    FieldRemoved { field: String },
}

impl Refusal {
    /// Transient message shown to the user.
    pub fn tip(&self) -> &'static str {
        match self {
            Refusal::MinimumCardinality {
                list: ListName::Education,
            } => "Необходимо иметь хотя бы одно образование",
            Refusal::MinimumCardinality {
                list: ListName::Experience,
            } => "Необходимо иметь хотя бы один опыт работы",
            Refusal::MinimumCardinality { .. } => "Нельзя удалить последнюю запись",
            Refusal::IndexOutOfRange { .. } => "Запись не найдена",
            Refusal::AtBoundary {
                direction: Direction::Up,
                ..
            } => "Раздел уже находится в начале списка",
            Refusal::AtBoundary {
                direction: Direction::Down,
                ..
            } => "Раздел уже находится в конце списка",
            Refusal::UnknownField { .. } => "Такого поля нет",
            Refusal::InvalidValue { .. } => "Недопустимое значение",
            Refusal::FieldRemoved { .. } => "Поле было удалено, пока улучшался текст",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Refused(Refusal),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    pub fn refusal(&self) -> Option<&Refusal> {
        match self {
            Outcome::Applied => None,
            Outcome::Refused(refusal) => Some(refusal),
        }
    }
}

pub(crate) fn refuse(refusal: Refusal) -> Outcome {
    warn!("Mutation refused: {refusal}");
    Outcome::Refused(refusal)
}

fn check_index(list: ListName, index: usize, len: usize) -> Result<(), Outcome> {
    if index < len {
        Ok(())
    } else {
        Err(refuse(Refusal::IndexOutOfRange { list, index, len }))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Operations
// ────────────────────────────────────────────────────────────────────────────

/// Writes `value` into the addressed field. No-op if the entry or field does not exist.
pub fn set_field(document: &mut Document, path: &FieldPath, value: &str) -> Outcome {
    match path {
        FieldPath::Top(field) => match field.as_str() {
            "skills" => set_skills_text(document, value),
            "templateId" => set_template(document, value),
            name => match document.identity.field_mut(name) {
                Some(slot) => {
                    *slot = value.to_string();
                    Outcome::Applied
                }
                None => refuse(Refusal::UnknownField {
                    field: name.to_string(),
                }),
            },
        },
        FieldPath::Entry { list, index, field } => {
            set_entry_field(document, *list, *index, field, value)
        }
    }
}

fn set_entry_field(
    document: &mut Document,
    list: ListName,
    index: usize,
    field: &str,
    value: &str,
) -> Outcome {
    let unknown = || {
        refuse(Refusal::UnknownField {
            field: field.to_string(),
        })
    };

    let slot = match list {
        ListName::Education => {
            if let Err(refused) = check_index(list, index, document.education.len()) {
                return refused;
            }
            document.education[index].field_mut(field)
        }
        ListName::Experience => {
            if let Err(refused) = check_index(list, index, document.experience.len()) {
                return refused;
            }
            document.experience[index].field_mut(field)
        }
        ListName::CustomSections => {
            if let Err(refused) = check_index(list, index, document.custom_sections.len()) {
                return refused;
            }
            let section = &mut document.custom_sections[index];
            return match section.set_field(field, value) {
                Ok(()) => Outcome::Applied,
                Err(FieldRejection::Unknown) => unknown(),
                Err(FieldRejection::InvalidValue) => refuse(Refusal::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                }),
            };
        }
    };

    match slot {
        Some(slot) => {
            *slot = value.to_string();
            Outcome::Applied
        }
        None => unknown(),
    }
}

/// Reads the current value at a path. `None` when the path does not resolve.
pub fn get_field(document: &Document, path: &FieldPath) -> Option<String> {
    match path {
        FieldPath::Top(field) => match field.as_str() {
            "skills" => Some(document.skills.clone()),
            "templateId" => Some(document.template_id.as_str().to_string()),
            name => document.identity.field(name).map(str::to_string),
        },
        FieldPath::Entry { list, index, field } => match list {
            ListName::Education => document
                .education
                .get(*index)
                .and_then(|e| e.field(field))
                .map(str::to_string),
            ListName::Experience => document
                .experience
                .get(*index)
                .and_then(|e| e.field(field))
                .map(str::to_string),
            ListName::CustomSections => document
                .custom_sections
                .get(*index)
                .and_then(|s| s.field(field)),
        },
    }
}

/// Appends a record of the list's default shape.
pub fn add_list_item(document: &mut Document, list: ListName) -> Outcome {
    match list {
        ListName::Education => document.education.push(EducationEntry::default()),
        ListName::Experience => document.experience.push(ExperienceEntry::default()),
        ListName::CustomSections => {
            return add_custom_section(document, SectionKind::Generic);
        }
    }
    Outcome::Applied
}

/// Removes the entry at `index`. Education and experience never drop below one entry.
pub fn remove_list_item(document: &mut Document, list: ListName, index: usize) -> Outcome {
    match list {
        ListName::Education => remove_floored(&mut document.education, list, index),
        ListName::Experience => remove_floored(&mut document.experience, list, index),
        ListName::CustomSections => remove_custom_section(document, index),
    }
}

fn remove_floored<T>(items: &mut Vec<T>, list: ListName, index: usize) -> Outcome {
    if let Err(refused) = check_index(list, index, items.len()) {
        return refused;
    }
    if list.has_floor() && items.len() <= 1 {
        return refuse(Refusal::MinimumCardinality { list });
    }
    items.remove(index);
    Outcome::Applied
}

pub fn add_custom_section(document: &mut Document, kind: SectionKind) -> Outcome {
    let section = registry::defaults_for(kind);
    debug!("Adding {} section {}", kind.as_str(), section.id());
    document.custom_sections.push(section);
    Outcome::Applied
}

pub fn remove_custom_section(document: &mut Document, index: usize) -> Outcome {
    if let Err(refused) = check_index(
        ListName::CustomSections,
        index,
        document.custom_sections.len(),
    ) {
        return refused;
    }
    document.custom_sections.remove(index);
    Outcome::Applied
}

/// Swaps the section with its neighbour. First cannot move up, last cannot move down.
pub fn move_custom_section(document: &mut Document, index: usize, direction: Direction) -> Outcome {
    let len = document.custom_sections.len();
    if let Err(refused) = check_index(ListName::CustomSections, index, len) {
        return refused;
    }
    let target = match direction {
        Direction::Up if index > 0 => index - 1,
        Direction::Down if index + 1 < len => index + 1,
        _ => return refuse(Refusal::AtBoundary { index, direction }),
    };
    document.custom_sections.swap(index, target);
    Outcome::Applied
}

/// Replaces the section at `index` with one of another type, keeping its id.
pub fn change_section_type(document: &mut Document, index: usize, kind: SectionKind) -> Outcome {
    let Some(section) = document.custom_sections.get_mut(index) else {
        return refuse(Refusal::IndexOutOfRange {
            list: ListName::CustomSections,
            index,
            len: document.custom_sections.len(),
        });
    };
    *section = registry::convert(section, kind);
    Outcome::Applied
}

/// Stores a known template id verbatim, anything else as `classic`.
pub fn set_template(document: &mut Document, id: &str) -> Outcome {
    if !TemplateId::is_known(id) {
        debug!("Unknown template id '{id}', falling back to classic");
    }
    document.template_id = TemplateId::parse_or_default(id);
    Outcome::Applied
}

pub fn set_skills_text(document: &mut Document, text: &str) -> Outcome {
    document.skills = text.to_string();
    Outcome::Applied
}

// ────────────────────────────────────────────────────────────────────────────
// Command form
// ────────────────────────────────────────────────────────────────────────────

/// Serializable form of every operation, as sent by the editor client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    SetField { path: FieldPath, value: String },
    AddListItem { list: ListName },
    RemoveListItem { list: ListName, index: usize },
    AddCustomSection { kind: SectionKind },
    RemoveCustomSection { index: usize },
    MoveCustomSection { index: usize, direction: Direction },
    ChangeSectionType { index: usize, kind: SectionKind },
    SetTemplate { template_id: String },
    SetSkillsText { text: String },
}

pub fn apply(document: &mut Document, mutation: &Mutation) -> Outcome {
    match mutation {
        Mutation::SetField { path, value } => set_field(document, path, value),
        Mutation::AddListItem { list } => add_list_item(document, *list),
        Mutation::RemoveListItem { list, index } => remove_list_item(document, *list, *index),
        Mutation::AddCustomSection { kind } => add_custom_section(document, *kind),
        Mutation::RemoveCustomSection { index } => remove_custom_section(document, *index),
        Mutation::MoveCustomSection { index, direction } => {
            move_custom_section(document, *index, *direction)
        }
        Mutation::ChangeSectionType { index, kind } => change_section_type(document, *index, *kind),
        Mutation::SetTemplate { template_id } => set_template(document, template_id),
        Mutation::SetSkillsText { text } => set_skills_text(document, text),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
