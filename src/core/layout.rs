//! Dashboard widget layout.
//!
//! `DashboardLayout` is a pure grid reducer: widgets occupy rectangles of
//! cells and never overlap. `DragSession` drives it from pointer events:
//! mouse-move only previews a placement, mouse-up commits it, and the caller
//! persists what mouse-up returns through `LayoutStore`.

use crate::domain::model::DashboardWidget;
use crate::domain::ports::Storage;
use crate::utils::error::{DeskError, Result};
use serde::{Deserialize, Serialize};

/// Rows available to widgets; `y + h` never exceeds this.
pub const MAX_ROWS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMetrics {
    pub columns: u32,
    /// Pixel width of one column.
    pub cell_width: f64,
    /// Pixel height of one row.
    pub row_height: f64,
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self {
            columns: crate::config::DEFAULT_GRID_COLUMNS,
            cell_width: 100.0,
            row_height: 80.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardLayout {
    pub columns: u32,
    pub widgets: Vec<DashboardWidget>,
}

impl DashboardLayout {
    pub fn new(columns: u32) -> Self {
        Self {
            columns: columns.max(1),
            widgets: Vec::new(),
        }
    }

    pub fn widget(&self, id: &str) -> Option<&DashboardWidget> {
        self.widgets.iter().find(|w| w.id == id)
    }

    /// Whether a `w`x`h` block at (`x`, `y`) hits any widget other than `ignore_id`.
    pub fn collides(&self, x: u32, y: u32, w: u32, h: u32, ignore_id: Option<&str>) -> bool {
        self.widgets
            .iter()
            .filter(|other| Some(other.id.as_str()) != ignore_id)
            .any(|other| other.overlaps(x, y, w, h))
    }

    fn fits_horizontally(&self, x: u32, w: u32) -> bool {
        x.checked_add(w).is_some_and(|right| right <= self.columns)
    }

    fn fits_vertically(y: u32, h: u32) -> bool {
        y.checked_add(h).is_some_and(|bottom| bottom <= MAX_ROWS)
    }

    fn bottom(&self) -> u32 {
        self.widgets
            .iter()
            .map(|w| w.y.saturating_add(w.h))
            .max()
            .unwrap_or(0)
    }

    /// Row-major scan from (`start_x`, `start_y`) for the first cell where the
    /// block fits. The row below every widget is always free, so this ends.
    pub fn next_free_from(
        &self,
        start_x: u32,
        start_y: u32,
        w: u32,
        h: u32,
        ignore_id: Option<&str>,
    ) -> (u32, u32) {
        let w = w.min(self.columns);
        let last_row = self.bottom().max(start_y);
        let mut y = start_y;
        let mut x = start_x;

        while y <= last_row {
            while self.fits_horizontally(x, w) {
                if !self.collides(x, y, w, h, ignore_id) {
                    return (x, y);
                }
                x += 1;
            }
            x = 0;
            match y.checked_add(1) {
                Some(next) => y = next,
                None => break,
            }
        }

        (0, last_row.saturating_add(1))
    }

    pub fn first_free(&self, w: u32, h: u32) -> (u32, u32) {
        self.next_free_from(0, 0, w, h, None)
    }

    /// Target cell if free, otherwise the next free cell in row-major order.
    pub fn resolve_position(&self, id: &str, x: u32, y: u32) -> Option<(u32, u32)> {
        let widget = self.widget(id)?;
        let w = widget.w.min(self.columns);
        let x = x.min(self.columns - w);
        let y = y.min(MAX_ROWS.saturating_sub(widget.h));
        if !self.collides(x, y, w, widget.h, Some(id)) {
            return Some((x, y));
        }
        Some(self.next_free_from(x, y, w, widget.h, Some(id)))
    }

    /// Moves a widget, relocating it instead of overlapping another one.
    pub fn place(&mut self, id: &str, x: u32, y: u32) -> Result<(u32, u32)> {
        let (x, y) = self
            .resolve_position(id, x, y)
            .ok_or_else(|| unknown_widget(id))?;
        let h = self.widget(id).map_or(1, |w| w.h);
        check_rows(id, y, h)?;
        if let Some(widget) = self.widgets.iter_mut().find(|w| w.id == id) {
            widget.x = x;
            widget.y = y;
        }
        Ok((x, y))
    }

    /// Adds a widget at the first free position; its own x/y are ignored.
    pub fn add_widget(&mut self, mut widget: DashboardWidget) -> Result<(u32, u32)> {
        if self.widget(&widget.id).is_some() {
            return Err(DeskError::LayoutError {
                message: format!("widget '{}' already exists", widget.id),
            });
        }
        if widget.w == 0 || widget.h == 0 {
            return Err(DeskError::LayoutError {
                message: format!("widget '{}' must be at least 1x1", widget.id),
            });
        }
        widget.w = widget.w.min(self.columns);
        let (x, y) = self.first_free(widget.w, widget.h);
        check_rows(&widget.id, y, widget.h)?;
        widget.x = x;
        widget.y = y;
        self.widgets.push(widget);
        Ok((x, y))
    }

    pub fn remove_widget(&mut self, id: &str) -> Result<DashboardWidget> {
        let index = self
            .widgets
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| unknown_widget(id))?;
        Ok(self.widgets.remove(index))
    }

    /// Resizes in place when room allows, otherwise relocates the widget.
    pub fn resize_widget(&mut self, id: &str, w: u32, h: u32) -> Result<(u32, u32)> {
        if w == 0 || h == 0 {
            return Err(DeskError::LayoutError {
                message: format!("widget '{}' must be at least 1x1", id),
            });
        }
        check_rows(id, 0, h)?;
        let columns = self.columns;
        let widget = self
            .widgets
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| unknown_widget(id))?;
        widget.w = w.min(columns);
        widget.h = h;
        let (x, y) = (widget.x, widget.y);
        self.place(id, x, y)
    }

    /// Every widget inside the grid and no two sharing a cell.
    pub fn is_consistent(&self) -> bool {
        self.widgets.iter().enumerate().all(|(i, a)| {
            a.w > 0
                && a.h > 0
                && self.fits_horizontally(a.x, a.w)
                && Self::fits_vertically(a.y, a.h)
                && self.widgets[i + 1..]
                    .iter()
                    .all(|b| !a.overlaps(b.x, b.y, b.w, b.h))
        })
    }
}

fn check_rows(id: &str, y: u32, h: u32) -> Result<()> {
    if DashboardLayout::fits_vertically(y, h) {
        return Ok(());
    }
    Err(DeskError::LayoutError {
        message: format!("widget '{}' would extend past row {}", id, MAX_ROWS),
    })
}

fn unknown_widget(id: &str) -> DeskError {
    DeskError::LayoutError {
        message: format!("no widget '{}' on the dashboard", id),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        widget_id: String,
        /// Cursor offset from the widget's top-left corner, in pixels.
        grab_offset: (f64, f64),
        preview: Option<(u32, u32)>,
    },
}

/// Pointer-driven editing of a committed layout.
#[derive(Debug, Clone)]
pub struct DragSession {
    committed: DashboardLayout,
    metrics: GridMetrics,
    state: DragState,
}

impl DragSession {
    pub fn new(layout: DashboardLayout, metrics: GridMetrics) -> Self {
        Self {
            committed: layout,
            metrics,
            state: DragState::Idle,
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn committed(&self) -> &DashboardLayout {
        &self.committed
    }

    /// Committed layout with the in-flight preview applied.
    pub fn preview_layout(&self) -> DashboardLayout {
        let mut layout = self.committed.clone();
        if let DragState::Dragging {
            widget_id,
            preview: Some((x, y)),
            ..
        } = &self.state
        {
            if let Some(widget) = layout.widgets.iter_mut().find(|w| &w.id == widget_id) {
                widget.x = *x;
                widget.y = *y;
            }
        }
        layout
    }

    pub fn mouse_down(&mut self, widget_id: &str, cursor: (f64, f64)) -> Result<()> {
        if let DragState::Dragging { widget_id: active, .. } = &self.state {
            return Err(DeskError::LayoutError {
                message: format!("already dragging '{}'", active),
            });
        }
        let widget = self
            .committed
            .widget(widget_id)
            .ok_or_else(|| unknown_widget(widget_id))?;
        let origin_x = widget.x as f64 * self.metrics.cell_width;
        let origin_y = widget.y as f64 * self.metrics.row_height;

        tracing::debug!("Drag started on widget '{}'", widget_id);
        self.state = DragState::Dragging {
            widget_id: widget_id.to_string(),
            grab_offset: (cursor.0 - origin_x, cursor.1 - origin_y),
            preview: None,
        };
        Ok(())
    }

    /// Grid cell under the widget's top-left corner, clamped into the grid.
    fn target_cell(&self, cursor: (f64, f64), grab_offset: (f64, f64), width: u32) -> (u32, u32) {
        let left = (cursor.0 - grab_offset.0) / self.metrics.cell_width;
        let top = (cursor.1 - grab_offset.1) / self.metrics.row_height;
        let max_x = self.committed.columns.saturating_sub(width) as f64;
        let x = left.round().clamp(0.0, max_x) as u32;
        let y = top.round().max(0.0) as u32;
        (x, y)
    }

    /// Updates the preview; nothing is committed. Returns the previewed cell.
    pub fn mouse_move(&mut self, cursor: (f64, f64)) -> Option<(u32, u32)> {
        let (widget_id, grab_offset) = match &self.state {
            DragState::Dragging {
                widget_id,
                grab_offset,
                ..
            } => (widget_id.clone(), *grab_offset),
            DragState::Idle => return None,
        };
        let width = self.committed.widget(&widget_id)?.w;
        let (x, y) = self.target_cell(cursor, grab_offset, width);
        let resolved = self.committed.resolve_position(&widget_id, x, y)?;

        if let DragState::Dragging { preview, .. } = &mut self.state {
            *preview = Some(resolved);
        }
        Some(resolved)
    }

    /// Commits the preview and returns the layout to persist.
    pub fn mouse_up(&mut self) -> Option<DashboardLayout> {
        let state = std::mem::replace(&mut self.state, DragState::Idle);
        match state {
            DragState::Dragging {
                widget_id,
                preview: Some((x, y)),
                ..
            } => match self.committed.place(&widget_id, x, y) {
                Ok(position) => {
                    tracing::debug!("Widget '{}' dropped at {:?}", widget_id, position);
                    Some(self.committed.clone())
                }
                Err(e) => {
                    tracing::warn!("Dropping widget failed: {}", e);
                    None
                }
            },
            _ => None,
        }
    }

    /// Abandons the drag; the committed layout is untouched.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }

    pub fn into_layout(self) -> DashboardLayout {
        self.committed
    }
}

/// Per-user layout persistence on top of a key/value store.
pub struct LayoutStore<S: Storage> {
    storage: S,
}

impl<S: Storage> LayoutStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn key_for(user_id: &str) -> String {
        format!("dashboardLayout_{}", user_id)
    }

    /// The saved layout, or an empty grid when nothing was saved or the
    /// stored document no longer parses.
    pub async fn load(&self, user_id: &str, columns: u32) -> Result<DashboardLayout> {
        let Some(bytes) = self.storage.read_key(&Self::key_for(user_id)).await? else {
            return Ok(DashboardLayout::new(columns));
        };
        match serde_json::from_slice::<DashboardLayout>(&bytes) {
            Ok(layout) if layout.is_consistent() => Ok(layout),
            Ok(_) => {
                tracing::warn!("Stored layout for '{}' overlaps itself, starting fresh", user_id);
                Ok(DashboardLayout::new(columns))
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable layout for '{}': {}", user_id, e);
                Ok(DashboardLayout::new(columns))
            }
        }
    }

    pub async fn save(&self, user_id: &str, layout: &DashboardLayout) -> Result<()> {
        let data = serde_json::to_vec_pretty(layout)?;
        self.storage.write_key(&Self::key_for(user_id), &data).await?;
        tracing::debug!("Saved layout with {} widgets for '{}'", layout.widgets.len(), user_id);
        Ok(())
    }

    pub async fn reset(&self, user_id: &str) -> Result<()> {
        self.storage.remove_key(&Self::key_for(user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_with(widgets: Vec<DashboardWidget>) -> DashboardLayout {
        DashboardLayout {
            columns: 12,
            widgets,
        }
    }

    #[test]
    fn test_drop_on_occupied_cell_relocates() {
        let mut layout = layout_with(vec![
            DashboardWidget::new("a", "stats", 2, 2).at(0, 0),
            DashboardWidget::new("b", "chart", 2, 2).at(4, 0),
        ]);

        let position = layout.place("b", 0, 0).unwrap();

        assert_eq!(position, (2, 0));
        assert!(layout.is_consistent());
    }

    #[test]
    fn test_free_target_is_used_as_is() {
        let mut layout = layout_with(vec![
            DashboardWidget::new("a", "stats", 2, 2).at(0, 0),
            DashboardWidget::new("b", "chart", 2, 2).at(4, 0),
        ]);
        assert_eq!(layout.place("b", 6, 3).unwrap(), (6, 3));
    }

    #[test]
    fn test_relocation_wraps_to_next_row() {
        let mut layout = DashboardLayout::new(4);
        layout.widgets = vec![
            DashboardWidget::new("a", "stats", 2, 2).at(0, 0),
            DashboardWidget::new("b", "stats", 2, 2).at(2, 0),
            DashboardWidget::new("d", "stats", 2, 2).at(0, 2),
            DashboardWidget::new("c", "stats", 2, 2).at(2, 2),
        ];

        // rows 0 and 1 are full and (0, 2) is taken by "d"
        assert_eq!(layout.place("c", 1, 0).unwrap(), (2, 2));
        assert!(layout.is_consistent());
    }

    #[test]
    fn test_target_clamped_inside_grid() {
        let mut layout = layout_with(vec![DashboardWidget::new("a", "stats", 3, 1).at(0, 0)]);
        assert_eq!(layout.place("a", 11, 0).unwrap(), (9, 0));
    }

    #[test]
    fn test_move_far_below_grid_is_clamped() {
        let mut layout = layout_with(vec![
            DashboardWidget::new("a", "stats", 2, 2).at(0, 0),
            DashboardWidget::new("b", "chart", 2, 2).at(4, 0),
        ]);

        let (x, y) = layout.place("b", 0, u32::MAX).unwrap();
        assert_eq!((x, y), (0, MAX_ROWS - 2));
        assert!(layout.is_consistent());

        // the next widget still finds room at the top
        assert_eq!(layout.add_widget(DashboardWidget::new("c", "stats", 2, 2)).unwrap(), (2, 0));
    }

    #[test]
    fn test_out_of_range_widgets_are_inconsistent() {
        let layout = layout_with(vec![
            DashboardWidget::new("a", "stats", 2, 2).at(0, 0),
            DashboardWidget::new("b", "chart", 2, 2).at(0, u32::MAX),
        ]);
        assert!(!layout.is_consistent());

        let layout = layout_with(vec![DashboardWidget::new("a", "stats", 2, 2).at(u32::MAX, 0)]);
        assert!(!layout.is_consistent());

        let mut layout = DashboardLayout::new(12);
        assert!(layout.add_widget(DashboardWidget::new("tall", "stats", 1, MAX_ROWS + 1)).is_err());
    }

    #[test]
    fn test_add_remove_resize() {
        let mut layout = DashboardLayout::new(4);
        assert_eq!(layout.add_widget(DashboardWidget::new("a", "stats", 2, 1)).unwrap(), (0, 0));
        assert_eq!(layout.add_widget(DashboardWidget::new("b", "stats", 2, 1)).unwrap(), (2, 0));
        assert_eq!(layout.add_widget(DashboardWidget::new("c", "stats", 4, 1)).unwrap(), (0, 1));
        assert!(layout.add_widget(DashboardWidget::new("a", "stats", 1, 1)).is_err());

        // growing "a" to 3 wide collides with "b", so it moves below "c"
        assert_eq!(layout.resize_widget("a", 3, 1).unwrap(), (0, 2));
        assert!(layout.is_consistent());

        layout.remove_widget("b").unwrap();
        assert!(layout.remove_widget("b").is_err());
        assert_eq!(layout.widgets.len(), 2);
    }

    #[test]
    fn test_drag_previews_then_commits() {
        let layout = layout_with(vec![
            DashboardWidget::new("a", "stats", 2, 2).at(0, 0),
            DashboardWidget::new("b", "chart", 2, 2).at(4, 0),
        ]);
        let mut session = DragSession::new(layout, GridMetrics::default());

        // grab "b" 10px into its top-left cell
        session.mouse_down("b", (410.0, 10.0)).unwrap();
        assert!(matches!(session.state(), DragState::Dragging { .. }));

        // hover over "a": preview relocates, committed layout is unchanged
        assert_eq!(session.mouse_move((20.0, 15.0)), Some((2, 0)));
        assert_eq!(session.committed().widget("b").unwrap().x, 4);
        assert_eq!(session.preview_layout().widget("b").unwrap().x, 2);

        let saved = session.mouse_up().unwrap();
        assert_eq!(saved.widget("b").unwrap().x, 2);
        assert_eq!(session.state(), &DragState::Idle);
    }

    #[test]
    fn test_cancel_discards_preview() {
        let layout = layout_with(vec![DashboardWidget::new("a", "stats", 2, 2).at(0, 0)]);
        let mut session = DragSession::new(layout.clone(), GridMetrics::default());

        session.mouse_down("a", (5.0, 5.0)).unwrap();
        session.mouse_move((505.0, 165.0));
        session.cancel();

        assert_eq!(session.committed(), &layout);
        assert!(session.mouse_up().is_none());
    }

    #[test]
    fn test_mouse_events_without_drag_are_ignored() {
        let mut session = DragSession::new(DashboardLayout::new(12), GridMetrics::default());
        assert!(session.mouse_move((10.0, 10.0)).is_none());
        assert!(session.mouse_up().is_none());
        assert!(session.mouse_down("missing", (0.0, 0.0)).is_err());
    }
}
