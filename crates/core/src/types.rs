/// Opaque widget identifier, unique within a page.
pub type WidgetId = String;

/// Opaque block identifier, unique within its owning widget.
pub type BlockId = String;

/// Project identifier used to scope storage keys and media URLs.
pub type ProjectId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Reserved id of the global header widget.
pub const HEADER_ID: &str = "header";

/// Reserved id of the global footer widget.
pub const FOOTER_ID: &str = "footer";

/// Returns `true` for ids reserved for global widgets.
pub fn is_reserved_widget_id(id: &str) -> bool {
    id == HEADER_ID || id == FOOTER_ID
}

/// Generate a fresh block id (`block_<uuid-v4-simple>`).
pub fn new_block_id() -> BlockId {
    format!("block_{}", uuid::Uuid::new_v4().simple())
}

/// Generate a fresh widget id (`widget_<uuid-v7-simple>`).
///
/// UUIDv7 keeps ids roughly creation-ordered, which makes stored pages
/// easier to eyeball.
pub fn new_widget_id() -> WidgetId {
    format!("widget_{}", uuid::Uuid::now_v7().simple())
}
