//! VisualTree: the styled, renderer-agnostic output of a template.
//!
//! Content nodes carry a `field` tag naming the document field they display, e.g.
//! `experience.0.company` or `customSections.<id>.title`. Decorative nodes (bullets,
//! icons, accent bars, section headings) never carry one.

use serde::Serialize;

/// Structural role of a node, stable across templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Page,
    Header,
    Identity,
    Photo,
    Name,
    Position,
    Contacts,
    Contact,
    Section,
    SectionHeading,
    Skills,
    Skill,
    Entry,
    EntryTitle,
    EntryMeta,
    EntrySubtitle,
    EntryBody,
    Decoration,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Paint {
    None,
    Solid { color: &'static str },
    LinearGradient {
        from: &'static str,
        to: &'static str,
        angle_deg: u16,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    Column,
    Row,
    /// Row that wraps onto new lines.
    Wrap,
    /// Row with the first child left and the rest pushed right.
    SpaceBetween,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    Start,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Border {
    pub width: f32,
    pub color: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoxStyle {
    pub background: Paint,
    pub padding: f32,
    pub gap: f32,
    pub margin_bottom: f32,
    pub flow: Flow,
    pub align: Align,
    pub radius: f32,
    pub shadow: bool,
    pub border_bottom: Option<Border>,
    /// Fixed size for purely decorative boxes (accent bars).
    pub size: Option<(f32, f32)>,
}

impl BoxStyle {
    pub const fn column() -> Self {
        Self {
            background: Paint::None,
            padding: 0.0,
            gap: 0.0,
            margin_bottom: 0.0,
            flow: Flow::Column,
            align: Align::Start,
            radius: 0.0,
            shadow: false,
            border_bottom: None,
            size: None,
        }
    }

    pub const fn with_flow(mut self, flow: Flow) -> Self {
        self.flow = flow;
        self
    }

    pub const fn with_gap(mut self, gap: f32) -> Self {
        self.gap = gap;
        self
    }

    pub const fn with_margin(mut self, margin_bottom: f32) -> Self {
        self.margin_bottom = margin_bottom;
        self
    }

    pub const fn with_padding(mut self, padding: f32) -> Self {
        self.padding = padding;
        self
    }

    pub const fn with_align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub const fn with_background(mut self, background: Paint) -> Self {
        self.background = background;
        self
    }

    pub const fn card(mut self, radius: f32) -> Self {
        self.radius = radius;
        self.shadow = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextStyle {
    pub size: f32,
    pub weight: u16,
    pub color: &'static str,
    pub align: Align,
}

impl TextStyle {
    pub const fn new(size: f32, weight: u16, color: &'static str) -> Self {
        Self {
            size,
            weight,
            color,
            align: Align::Start,
        }
    }

    pub const fn centered(mut self) -> Self {
        self.align = Align::Center;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Circle,
    Rounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageStyle {
    pub shape: Shape,
    pub border: Option<Border>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxNode {
    pub role: Role,
    /// Stable key for list children: section id or list index.
    pub key: Option<String>,
    pub style: BoxStyle,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextNode {
    pub role: Role,
    pub field: Option<String>,
    pub text: String,
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageNode {
    pub role: Role,
    pub field: Option<String>,
    pub uri: String,
    pub size: f32,
    pub style: ImageStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Box(BoxNode),
    Text(TextNode),
    Image(ImageNode),
}

impl Node {
    pub fn boxed(role: Role, style: BoxStyle, children: Vec<Node>) -> Self {
        Node::Box(BoxNode {
            role,
            key: None,
            style,
            children,
        })
    }

    pub fn keyed(role: Role, key: String, style: BoxStyle, children: Vec<Node>) -> Self {
        Node::Box(BoxNode {
            role,
            key: Some(key),
            style,
            children,
        })
    }

    /// Content text bound to a document field.
    pub fn field_text(role: Role, field: String, text: &str, style: TextStyle) -> Self {
        Node::Text(TextNode {
            role,
            field: Some(field),
            text: text.to_string(),
            style,
        })
    }

    /// Untagged text: headings, bullets, icons.
    pub fn label(role: Role, text: &str, style: TextStyle) -> Self {
        Node::Text(TextNode {
            role,
            field: None,
            text: text.to_string(),
            style,
        })
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            Node::Box(_) => None,
            Node::Text(t) => t.field.as_deref(),
            Node::Image(i) => i.field.as_deref(),
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Box(b) => &b.children,
            Node::Text(_) | Node::Image(_) => &[],
        }
    }

    /// Pre-order walk over this node and all descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}

/// Root of a rendered résumé.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualTree {
    pub template_id: &'static str,
    pub root: Node,
}

impl VisualTree {
    /// `(field, value)` pairs of every field-tagged node, in document order.
    pub fn tagged_values(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.root.walk(&mut |node| match node {
            Node::Text(t) => {
                if let Some(field) = &t.field {
                    out.push((field.clone(), t.text.clone()));
                }
            }
            Node::Image(i) => {
                if let Some(field) = &i.field {
                    out.push((field.clone(), i.uri.clone()));
                }
            }
            Node::Box(_) => {}
        });
        out
    }

    /// Keys of the custom-section boxes, in render order.
    pub fn section_order(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.root.walk(&mut |node| {
            if let Node::Box(b) = node {
                if let (Role::Section, Some(key)) = (b.role, &b.key) {
                    if key.starts_with("customSections.") {
                        out.push(key.trim_start_matches("customSections.").to_string());
                    }
                }
            }
        });
        out
    }
}
