//! # Domain Model
//!
//! Value types for everything the vault persists: [`Document`]s (notes made of
//! [`Page`]s), [`Container`]s (folders) and [`DeletedRecord`]s (trash entries).
//!
//! ## Value Semantics
//!
//! Every type here is a plain owned value. The store hands out clones, callers mutate
//! their copy freely, and nothing changes on disk or in the cache until the copy is
//! passed back to `save`.
//!
//! ## Hierarchy
//!
//! Documents and containers point at their parent container through `parent_id`, a
//! foreign key rather than a reference. `None` means the item lives at the root.
//! The container graph must stay acyclic; that check belongs to the store because it
//! needs to see the ancestors.
//!
//! ## Pages
//!
//! A live document always has at least one page. [`Document::new`] creates one blank
//! page and [`Document::remove_page`] refuses to delete the last one.
//!
//! ## Schema Evolution
//!
//! Optional and collection fields carry `#[serde(default)]`, so records written before
//! a field existed still decode.

use crate::codec;
use crate::error::IntegrityViolation;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The on-disk record families. Each has its own directory and file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Document,
    Container,
    Deleted,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [RecordKind::Document, RecordKind::Container, RecordKind::Deleted];

    pub fn dir_name(&self) -> &'static str {
        match self {
            RecordKind::Document => "documents",
            RecordKind::Container => "containers",
            RecordKind::Deleted => "trash",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            RecordKind::Document => "note",
            RecordKind::Container => "folder",
            RecordKind::Deleted => "trash",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Document => write!(f, "document"),
            RecordKind::Container => write!(f, "folder"),
            RecordKind::Deleted => write!(f, "deleted record"),
        }
    }
}

/// Which kind of live entity a trash entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Document,
    Container,
}

impl EntityKind {
    pub fn record_kind(&self) -> RecordKind {
        match self {
            EntityKind::Document => RecordKind::Document,
            EntityKind::Container => RecordKind::Container,
        }
    }
}

/// A value stored in its own slot, addressed by id.
pub trait Record: Clone {
    const KIND: RecordKind;

    fn id(&self) -> Uuid;

    /// The container this record lives in, `None` for root-level records.
    fn parent_id(&self) -> Option<Uuid>;

    /// Structural checks that must hold for a stored record.
    fn validate(&self) -> Result<(), IntegrityViolation> {
        Ok(())
    }
}

/// Records that can be named, moved and touched in the folder tree.
pub trait HierarchyItem: Record {
    fn name(&self) -> &str;
    fn set_name(&mut self, name: String);
    fn set_parent_id(&mut self, parent: Option<Uuid>);
    fn created_at(&self) -> DateTime<Utc>;

    /// Bumps the modification timestamp.
    fn touch(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// An RGB color, rendered as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` or `rrggbb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PageTemplate {
    #[default]
    Blank,
    Grid,
    Dotted,
    Lined,
}

/// How pages of a document are sized.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Custom {
        width: f64,
        height: f64,
    },
    /// Pages grow with their content.
    Infinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tool {
    #[default]
    Pen,
    Pencil,
    Marker,
    Highlighter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    #[serde(default)]
    pub tool: Tool,
    pub color: Color,
    pub width: f64,
    pub points: Vec<Point>,
}

/// Decoded form of a page's drawing payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Drawing {
    #[serde(default)]
    pub strokes: Vec<Stroke>,
}

impl Drawing {
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnnotation {
    pub id: Uuid,
    pub text: String,
    pub frame: Rect,
    pub font_size: f64,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnnotation {
    pub id: Uuid,
    pub frame: Rect,
    #[serde(with = "crate::base64_bytes")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub rotation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    Line,
    Arrow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeAnnotation {
    pub id: Uuid,
    pub shape: ShapeKind,
    pub frame: Rect,
    pub stroke: Color,
    #[serde(default)]
    pub fill: Option<Color>,
    pub stroke_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: Uuid,
    /// Encoded [`Drawing`]. Empty means nothing has been drawn.
    #[serde(default, with = "crate::base64_bytes")]
    pub drawing: Vec<u8>,
    #[serde(default, with = "crate::base64_bytes::option")]
    pub thumbnail: Option<Vec<u8>>,
    #[serde(default)]
    pub template: PageTemplate,
    #[serde(default)]
    pub texts: Vec<TextAnnotation>,
    #[serde(default)]
    pub images: Vec<ImageAnnotation>,
    #[serde(default)]
    pub shapes: Vec<ShapeAnnotation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    pub fn new(template: PageTemplate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            drawing: Vec::new(),
            thumbnail: None,
            template,
            texts: Vec::new(),
            images: Vec::new(),
            shapes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Decodes the drawing payload. A damaged payload yields an empty drawing.
    pub fn drawing(&self) -> Drawing {
        codec::decode_drawing(&self.drawing)
    }

    /// Replaces the drawing and drops the now stale thumbnail.
    pub fn set_drawing(&mut self, drawing: &Drawing) {
        self.drawing = if drawing.is_empty() {
            Vec::new()
        } else {
            codec::encode_drawing(drawing)
        };
        self.thumbnail = None;
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    pub pages: Vec<Page>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub page_size: PageSize,
}

impl Document {
    /// A new document with exactly one blank page.
    pub fn new(name: impl Into<String>, parent_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            pages: vec![Page::new(PageTemplate::Blank)],
            created_at: now,
            updated_at: now,
            parent_id,
            page_size: PageSize::default(),
        }
    }

    pub fn page(&self, page_id: Uuid) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == page_id)
    }

    fn page_index(&self, page_id: Uuid) -> Result<usize, IntegrityViolation> {
        self.pages
            .iter()
            .position(|p| p.id == page_id)
            .ok_or(IntegrityViolation::PageNotFound {
                document: self.id,
                page: page_id,
            })
    }

    /// Appends a fresh page and returns its id.
    pub fn add_page(&mut self, template: PageTemplate) -> Uuid {
        let page = Page::new(template);
        let id = page.id;
        self.pages.push(page);
        self.updated_at = Utc::now();
        id
    }

    /// Inserts `page` at `index`, clamped to the end of the document.
    pub fn insert_page(&mut self, index: usize, page: Page) {
        let index = index.min(self.pages.len());
        self.pages.insert(index, page);
        self.updated_at = Utc::now();
    }

    pub fn remove_page(&mut self, page_id: Uuid) -> Result<Page, IntegrityViolation> {
        let index = self.page_index(page_id)?;
        if self.pages.len() == 1 {
            return Err(IntegrityViolation::LastPage(self.id));
        }
        let removed = self.pages.remove(index);
        self.updated_at = Utc::now();
        Ok(removed)
    }

    /// Replaces the page with the same id.
    pub fn update_page(&mut self, mut page: Page) -> Result<(), IntegrityViolation> {
        let index = self.page_index(page.id)?;
        let now = Utc::now();
        page.updated_at = now;
        self.pages[index] = page;
        self.updated_at = now;
        Ok(())
    }

    /// Moves a page to `to_index` (clamped), shifting the others.
    pub fn move_page(&mut self, page_id: Uuid, to_index: usize) -> Result<(), IntegrityViolation> {
        let from = self.page_index(page_id)?;
        let page = self.pages.remove(from);
        let to = to_index.min(self.pages.len());
        self.pages.insert(to, page);
        self.updated_at = Utc::now();
        Ok(())
    }
}

impl Record for Document {
    const KIND: RecordKind = RecordKind::Document;

    fn id(&self) -> Uuid {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }

    fn validate(&self) -> Result<(), IntegrityViolation> {
        if self.pages.is_empty() {
            return Err(IntegrityViolation::LastPage(self.id));
        }
        Ok(())
    }
}

impl HierarchyItem for Document {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn set_parent_id(&mut self, parent: Option<Uuid>) {
        self.parent_id = parent;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub color: Option<Color>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Container {
    pub fn new(name: impl Into<String>, parent_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            parent_id,
            color: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Record for Container {
    const KIND: RecordKind = RecordKind::Container;

    fn id(&self) -> Uuid {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }
}

impl HierarchyItem for Container {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn set_parent_id(&mut self, parent: Option<Uuid>) {
        self.parent_id = parent;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A live entity of either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Document(Document),
    Container(Container),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Document(_) => EntityKind::Document,
            Entity::Container(_) => EntityKind::Container,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Entity::Document(d) => d.id,
            Entity::Container(c) => c.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entity::Document(d) => &d.name,
            Entity::Container(c) => &c.name,
        }
    }

    pub fn parent_id(&self) -> Option<Uuid> {
        match self {
            Entity::Document(d) => d.parent_id,
            Entity::Container(c) => c.parent_id,
        }
    }
}

impl From<Document> for Entity {
    fn from(doc: Document) -> Self {
        Entity::Document(doc)
    }
}

impl From<Container> for Entity {
    fn from(container: Container) -> Self {
        Entity::Container(container)
    }
}

/// How long soft-deleted records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetentionPolicy {
    Days(u32),
    Forever,
}

impl RetentionPolicy {
    pub fn days(&self) -> Option<u32> {
        match self {
            RetentionPolicy::Days(days) => Some(*days),
            RetentionPolicy::Forever => None,
        }
    }
}

impl From<Option<u32>> for RetentionPolicy {
    fn from(days: Option<u32>) -> Self {
        days.map(RetentionPolicy::Days)
            .unwrap_or(RetentionPolicy::Forever)
    }
}

/// A soft-deleted entity, kept as an encoded snapshot until restored or purged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedRecord {
    pub id: Uuid,
    pub original_id: Uuid,
    pub name: String,
    pub kind: EntityKind,
    pub deleted_at: DateTime<Utc>,
    #[serde(with = "crate::base64_bytes")]
    pub snapshot: Vec<u8>,
    #[serde(default)]
    pub original_parent_id: Option<Uuid>,
}

impl DeletedRecord {
    /// When this record becomes eligible for the expiry sweep.
    ///
    /// `None` for unbounded retention, and for a window that reaches past the last
    /// representable timestamp.
    pub fn expires_at(&self, policy: RetentionPolicy) -> Option<DateTime<Utc>> {
        let window = TimeDelta::try_days(i64::from(policy.days()?))?;
        self.deleted_at.checked_add_signed(window)
    }

    pub fn is_expired(&self, policy: RetentionPolicy, now: DateTime<Utc>) -> bool {
        match self.expires_at(policy) {
            Some(expiry) => now >= expiry,
            None => false,
        }
    }

    /// Days left before expiry, a partial day counting as one. Zero once expired.
    pub fn days_remaining(&self, policy: RetentionPolicy, now: DateTime<Utc>) -> Option<i64> {
        const DAY_SECS: i64 = 86_400;
        self.expires_at(policy).map(|expiry| {
            let secs = (expiry - now).num_seconds();
            if secs <= 0 {
                0
            } else {
                (secs + DAY_SECS - 1) / DAY_SECS
            }
        })
    }
}

impl Record for DeletedRecord {
    const KIND: RecordKind = RecordKind::Deleted;

    fn id(&self) -> Uuid {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.original_parent_id
    }
}
