//! Template Renderer: `render(document, template) -> VisualTree`.
//!
//! One shared layout walks the document in a fixed order; a `Theme` supplies the
//! styling. Templates therefore differ in colors, geometry and decorative chrome but
//! never in which fields appear or in what order.

use crate::models::document::{CustomSection, Document, TemplateId};
use crate::render::tree::{
    Align, Border, BoxStyle, Flow, ImageNode, ImageStyle, Node, Paint, Role, Shape, TextStyle,
    VisualTree,
};
use crate::sections::registry::{kind_label, primary_text, proficiency_label};

const HEADING_SKILLS: &str = "Навыки";
const HEADING_EXPERIENCE: &str = "Опыт работы";
const HEADING_EDUCATION: &str = "Образование";

const INK: &str = "#000000";
const MUTED: &str = "#818c99";
const VK_BLUE: &str = "#2688eb";
const VK_STEEL: &str = "#4a76a8";
const WHITE: &str = "#ffffff";
const PAPER: &str = "#f5f5f5";

// ────────────────────────────────────────────────────────────────────────────
// Themes
// ────────────────────────────────────────────────────────────────────────────

/// Styling of one template. Layout order lives in `render`, not here.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub page: BoxStyle,
    pub header: BoxStyle,
    pub identity: BoxStyle,
    pub photo_size: f32,
    pub photo: ImageStyle,
    pub name: TextStyle,
    pub position: TextStyle,
    pub contacts: BoxStyle,
    pub contact: TextStyle,
    /// Email and phone glyphs shown before each contact.
    pub contact_icons: Option<(&'static str, &'static str)>,
    /// Contacts rendered inside the colored header instead of below it.
    pub contacts_in_header: bool,
    pub body: BoxStyle,
    pub section: BoxStyle,
    pub heading_box: BoxStyle,
    pub heading: TextStyle,
    /// Short bar under each heading.
    pub heading_accent: Option<(f32, f32, &'static str)>,
    pub skills: BoxStyle,
    pub skill_chip: BoxStyle,
    pub skill_text: TextStyle,
    pub skill_bullet: Option<&'static str>,
    pub entry: BoxStyle,
    pub entry_title: TextStyle,
    pub entry_meta: TextStyle,
    pub entry_subtitle: TextStyle,
    pub entry_body: TextStyle,
}

static CLASSIC: Theme = Theme {
    page: BoxStyle::column().with_padding(20.0).card(8.0),
    header: BoxStyle::column().with_margin(20.0),
    identity: BoxStyle::column().with_flow(Flow::Row).with_gap(20.0),
    photo_size: 100.0,
    photo: ImageStyle {
        shape: Shape::Circle,
        border: None,
    },
    name: TextStyle::new(24.0, 700, INK),
    position: TextStyle::new(18.7, 400, INK),
    contacts: BoxStyle::column().with_margin(20.0),
    contact: TextStyle::new(14.0, 400, INK),
    contact_icons: None,
    contacts_in_header: false,
    body: BoxStyle::column(),
    section: BoxStyle::column().with_margin(20.0),
    heading_box: BoxStyle {
        border_bottom: Some(Border {
            width: 1.0,
            color: "#dddddd",
        }),
        ..BoxStyle::column().with_padding(5.0).with_margin(10.0)
    },
    heading: TextStyle::new(18.7, 700, INK),
    heading_accent: None,
    skills: BoxStyle::column().with_flow(Flow::Wrap).with_gap(10.0),
    skill_chip: BoxStyle::column().with_flow(Flow::Row).with_padding(5.0),
    skill_text: TextStyle::new(14.0, 400, INK),
    skill_bullet: Some("•"),
    entry: BoxStyle::column().with_margin(15.0),
    entry_title: TextStyle::new(16.0, 700, INK),
    entry_meta: TextStyle::new(14.0, 400, INK),
    entry_subtitle: TextStyle::new(14.0, 700, INK),
    entry_body: TextStyle::new(14.0, 400, INK),
};

static MODERN: Theme = Theme {
    page: BoxStyle::column()
        .with_padding(20.0)
        .with_background(Paint::Solid { color: PAPER })
        .card(8.0),
    header: BoxStyle::column().with_margin(30.0).with_align(Align::Center),
    identity: BoxStyle::column().with_align(Align::Center).with_gap(15.0),
    photo_size: 120.0,
    photo: ImageStyle {
        shape: Shape::Circle,
        border: None,
    },
    name: TextStyle::new(28.0, 700, INK).centered(),
    position: TextStyle::new(24.0, 400, VK_BLUE).centered(),
    contacts: BoxStyle::column()
        .with_flow(Flow::Row)
        .with_align(Align::Center)
        .with_gap(20.0)
        .with_margin(20.0),
    contact: TextStyle::new(14.0, 400, INK),
    contact_icons: None,
    contacts_in_header: false,
    body: BoxStyle::column(),
    section: BoxStyle::column().with_margin(30.0),
    heading_box: BoxStyle::column().with_align(Align::Center).with_margin(10.0),
    heading: TextStyle::new(18.7, 700, VK_BLUE).centered(),
    heading_accent: None,
    skills: BoxStyle::column()
        .with_flow(Flow::Wrap)
        .with_align(Align::Center)
        .with_gap(10.0),
    skill_chip: BoxStyle::column()
        .with_padding(5.0)
        .with_background(Paint::Solid { color: WHITE })
        .card(15.0),
    skill_text: TextStyle::new(14.0, 400, INK),
    skill_bullet: None,
    entry: BoxStyle::column()
        .with_padding(15.0)
        .with_margin(15.0)
        .with_background(Paint::Solid { color: WHITE })
        .card(10.0),
    entry_title: TextStyle::new(16.0, 700, INK),
    entry_meta: TextStyle::new(14.0, 400, MUTED),
    entry_subtitle: TextStyle::new(14.0, 700, INK),
    entry_body: TextStyle::new(14.0, 400, INK),
};

static CREATIVE: Theme = Theme {
    page: BoxStyle::column().card(8.0),
    header: BoxStyle::column()
        .with_padding(30.0)
        .with_gap(20.0)
        .with_background(Paint::LinearGradient {
            from: VK_STEEL,
            to: VK_BLUE,
            angle_deg: 135,
        }),
    identity: BoxStyle::column().with_flow(Flow::Row).with_gap(20.0),
    photo_size: 100.0,
    photo: ImageStyle {
        shape: Shape::Circle,
        border: Some(Border {
            width: 3.0,
            color: WHITE,
        }),
    },
    name: TextStyle::new(32.0, 700, WHITE),
    position: TextStyle::new(24.0, 400, WHITE),
    contacts: BoxStyle::column().with_gap(5.0),
    contact: TextStyle::new(14.0, 400, WHITE),
    contact_icons: Some(("📧", "📱")),
    contacts_in_header: true,
    body: BoxStyle::column().with_padding(20.0),
    section: BoxStyle::column().with_margin(30.0),
    heading_box: BoxStyle::column().with_padding(10.0).with_margin(15.0),
    heading: TextStyle::new(18.7, 700, INK),
    heading_accent: Some((50.0, 3.0, VK_STEEL)),
    skills: BoxStyle::column().with_flow(Flow::Wrap).with_gap(10.0),
    skill_chip: BoxStyle {
        padding: 8.0,
        radius: 5.0,
        ..BoxStyle::column().with_background(Paint::Solid { color: PAPER })
    },
    skill_text: TextStyle::new(14.0, 400, INK),
    skill_bullet: None,
    entry: BoxStyle::column().with_margin(20.0),
    entry_title: TextStyle::new(16.0, 700, VK_STEEL),
    entry_meta: TextStyle::new(14.0, 400, MUTED),
    entry_subtitle: TextStyle::new(14.0, 700, INK),
    entry_body: TextStyle::new(14.0, 400, INK),
};

pub fn theme(template: TemplateId) -> &'static Theme {
    match template {
        TemplateId::Classic => &CLASSIC,
        TemplateId::Modern => &MODERN,
        TemplateId::Creative => &CREATIVE,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rendering
// ────────────────────────────────────────────────────────────────────────────

/// Splits the raw skills string on commas, trimming and dropping empty tokens.
pub fn tokenize_skills(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Pure and deterministic: the same document and template always give the same tree.
pub fn render(document: &Document, template: TemplateId) -> VisualTree {
    let theme = theme(template);

    let identity = identity_block(document, theme);
    let contacts = contacts_block(document, theme);

    let mut page_children = Vec::new();
    if theme.contacts_in_header {
        let mut header = vec![identity];
        header.extend(contacts);
        page_children.push(Node::boxed(Role::Header, theme.header, header));
    } else {
        page_children.push(Node::boxed(Role::Header, theme.header, vec![identity]));
        page_children.extend(contacts);
    }

    let mut body = vec![
        skills_section(document, theme),
        experience_section(document, theme),
        education_section(document, theme),
    ];
    body.extend(
        document
            .custom_sections
            .iter()
            .map(|section| custom_section(section, theme)),
    );
    page_children.push(Node::boxed(Role::Section, theme.body, body));

    VisualTree {
        template_id: template.as_str(),
        root: Node::boxed(Role::Page, theme.page, page_children),
    }
}

fn identity_block(document: &Document, theme: &Theme) -> Node {
    let identity = &document.identity;
    let mut children = Vec::new();

    if !identity.photo.trim().is_empty() {
        children.push(Node::Image(ImageNode {
            role: Role::Photo,
            field: Some("photo".to_string()),
            uri: identity.photo.clone(),
            size: theme.photo_size,
            style: theme.photo,
        }));
    }

    let name = Node::boxed(
        Role::Name,
        BoxStyle::column()
            .with_flow(Flow::Row)
            .with_gap(theme.name.size * 0.25)
            .with_align(theme.name.align),
        vec![
            Node::field_text(Role::Name, "firstName".into(), &identity.first_name, theme.name),
            Node::field_text(Role::Name, "lastName".into(), &identity.last_name, theme.name),
        ],
    );
    let position = Node::field_text(
        Role::Position,
        "position".into(),
        &identity.position,
        theme.position,
    );
    children.push(Node::boxed(
        Role::Identity,
        BoxStyle::column().with_align(theme.name.align).with_gap(5.0),
        vec![name, position],
    ));

    Node::boxed(Role::Identity, theme.identity, children)
}

fn contacts_block(document: &Document, theme: &Theme) -> Option<Node> {
    let identity = &document.identity;
    let entries = [
        ("email", &identity.email, theme.contact_icons.map(|(mail, _)| mail)),
        ("phone", &identity.phone, theme.contact_icons.map(|(_, phone)| phone)),
    ];

    let children: Vec<Node> = entries
        .into_iter()
        .filter(|(_, value, _)| !value.trim().is_empty())
        .map(|(field, value, icon)| {
            let mut line = Vec::new();
            if let Some(icon) = icon {
                line.push(Node::label(Role::Decoration, icon, theme.contact));
            }
            line.push(Node::field_text(Role::Contact, field.into(), value, theme.contact));
            Node::boxed(
                Role::Contact,
                BoxStyle::column().with_flow(Flow::Row).with_gap(6.0),
                line,
            )
        })
        .collect();

    (!children.is_empty()).then(|| Node::boxed(Role::Contacts, theme.contacts, children))
}

/// Section heading with optional accent bar. Headings are chrome, never field-tagged
/// unless they display a field value.
fn heading(theme: &Theme, text: Node) -> Node {
    let mut children = vec![text];
    if let Some((width, height, color)) = theme.heading_accent {
        children.push(Node::boxed(
            Role::Decoration,
            BoxStyle {
                size: Some((width, height)),
                ..BoxStyle::column().with_background(Paint::Solid { color })
            },
            Vec::new(),
        ));
    }
    Node::boxed(Role::SectionHeading, theme.heading_box, children)
}

fn titled_section(theme: &Theme, key: &str, title: &str, content: Vec<Node>) -> Node {
    let mut children = vec![heading(theme, Node::label(Role::SectionHeading, title, theme.heading))];
    children.extend(content);
    Node::keyed(Role::Section, key.to_string(), theme.section, children)
}

fn skills_section(document: &Document, theme: &Theme) -> Node {
    let chips = tokenize_skills(&document.skills)
        .iter()
        .map(|skill| {
            let mut chip = Vec::new();
            if let Some(bullet) = theme.skill_bullet {
                chip.push(Node::label(Role::Decoration, bullet, theme.skill_text));
            }
            chip.push(Node::field_text(Role::Skill, "skills".into(), skill, theme.skill_text));
            Node::boxed(Role::Skill, theme.skill_chip, chip)
        })
        .collect();

    titled_section(
        theme,
        "skills",
        HEADING_SKILLS,
        vec![Node::boxed(Role::Skills, theme.skills, chips)],
    )
}

fn entry_header(title: Node, meta: Node) -> Node {
    Node::boxed(
        Role::EntryTitle,
        BoxStyle::column().with_flow(Flow::SpaceBetween),
        vec![title, meta],
    )
}

fn experience_section(document: &Document, theme: &Theme) -> Node {
    let entries = document
        .experience
        .iter()
        .enumerate()
        .map(|(i, exp)| {
            let tag = |field: &str| format!("experience.{i}.{field}");
            Node::keyed(
                Role::Entry,
                format!("experience.{i}"),
                theme.entry,
                vec![
                    entry_header(
                        Node::field_text(Role::EntryTitle, tag("position"), &exp.position, theme.entry_title),
                        Node::field_text(Role::EntryMeta, tag("period"), &exp.period, theme.entry_meta),
                    ),
                    Node::field_text(Role::EntrySubtitle, tag("company"), &exp.company, theme.entry_subtitle),
                    Node::field_text(Role::EntryBody, tag("description"), &exp.description, theme.entry_body),
                ],
            )
        })
        .collect();

    titled_section(theme, "experience", HEADING_EXPERIENCE, entries)
}

fn education_section(document: &Document, theme: &Theme) -> Node {
    let entries = document
        .education
        .iter()
        .enumerate()
        .map(|(i, edu)| {
            let tag = |field: &str| format!("education.{i}.{field}");
            Node::keyed(
                Role::Entry,
                format!("education.{i}"),
                theme.entry,
                vec![
                    entry_header(
                        Node::field_text(Role::EntryTitle, tag("institution"), &edu.institution, theme.entry_title),
                        Node::field_text(Role::EntryMeta, tag("year"), &edu.year, theme.entry_meta),
                    ),
                    Node::field_text(Role::EntrySubtitle, tag("degree"), &edu.degree, theme.entry_body),
                ],
            )
        })
        .collect();

    titled_section(theme, "education", HEADING_EDUCATION, entries)
}

/// Per-type sub-template. The heading shows the section's own title-like field when it
/// is filled, else the type label. Empty fields are omitted.
fn custom_section(section: &CustomSection, theme: &Theme) -> Node {
    let id = section.id();
    let tag = |field: &str| format!("customSections.{id}.{field}");
    let optional = |role: Role, field: &str, value: &str, style: TextStyle| {
        (!value.trim().is_empty()).then(|| Node::field_text(role, tag(field), value, style))
    };

    let title = primary_text(section);
    let title_field = match section {
        CustomSection::Certification(_) => "name",
        CustomSection::Language(_) => "language",
        CustomSection::Project(_) | CustomSection::Generic(_) => "title",
    };
    let title_node = if title.trim().is_empty() {
        Node::label(Role::SectionHeading, kind_label(section.kind()), theme.heading)
    } else {
        Node::field_text(Role::SectionHeading, tag(title_field), title, theme.heading)
    };

    let body: Vec<Option<Node>> = match section {
        CustomSection::Project(s) => vec![
            optional(Role::EntryMeta, "technologies", &s.technologies, theme.entry_meta),
            optional(Role::EntryBody, "description", &s.description, theme.entry_body),
            optional(Role::EntryMeta, "link", &s.link, theme.entry_meta),
        ],
        CustomSection::Certification(s) => vec![
            optional(Role::EntrySubtitle, "organization", &s.organization, theme.entry_subtitle),
            optional(Role::EntryMeta, "date", &s.date, theme.entry_meta),
        ],
        CustomSection::Language(s) => vec![Some(Node::field_text(
            Role::EntryMeta,
            tag("proficiency"),
            proficiency_label(s.proficiency),
            theme.entry_meta,
        ))],
        CustomSection::Generic(s) => {
            vec![optional(Role::EntryBody, "content", &s.content, theme.entry_body)]
        }
    };

    let mut children = vec![heading(theme, title_node)];
    children.push(Node::boxed(
        Role::Entry,
        BoxStyle::column().with_gap(4.0),
        body.into_iter().flatten().collect(),
    ));
    Node::keyed(Role::Section, format!("customSections.{id}"), theme.section, children)
}
