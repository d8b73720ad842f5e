//! Display panel: the sink for everything user-visible.
//!
//! The panel is deliberately dumb. It holds a status line, the last
//! captured frame, the last extracted template, and a list of raised
//! notices; rendering any of it is a collaborator concern. Only the
//! service's consumer task writes here, so the panel needs no locking.

use ridgeline_core::constants::MSG_WAITING_DATA;
use ridgeline_sensor::{FrameData, TemplateData};
use tracing::debug;

/// User-visible state of the scanner service.
///
/// # Examples
///
/// ```
/// use ridgeline_service::DisplayPanel;
///
/// let mut panel = DisplayPanel::new();
/// panel.set_status("Ready. Place your finger.");
/// assert_eq!(panel.status(), "Ready. Place your finger.");
/// assert_eq!(panel.template_text(), "Waiting for data...");
/// ```
#[derive(Debug, Clone)]
pub struct DisplayPanel {
    /// Current status line.
    status: String,

    /// Last captured frame, if any.
    frame: Option<FrameData>,

    /// Last extracted template, if any.
    template: Option<TemplateData>,

    /// Text shown in the template slot.
    template_text: String,

    /// Raised notices, oldest first. Notices are the loud surface;
    /// quiet updates only touch the status line.
    notices: Vec<String>,
}

impl DisplayPanel {
    /// Create an empty panel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: "Idle.".to_string(),
            frame: None,
            template: None,
            template_text: MSG_WAITING_DATA.to_string(),
            notices: Vec::new(),
        }
    }

    /// Current status line.
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Replace the status line.
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        debug!(status = %self.status, "status updated");
    }

    /// Last captured frame.
    #[must_use]
    pub fn frame(&self) -> Option<&FrameData> {
        self.frame.as_ref()
    }

    /// Show a captured frame.
    pub fn show_frame(&mut self, frame: FrameData) {
        self.frame = Some(frame);
    }

    /// Last extracted template.
    #[must_use]
    pub fn template(&self) -> Option<&TemplateData> {
        self.template.as_ref()
    }

    /// Text in the template slot.
    #[must_use]
    pub fn template_text(&self) -> &str {
        &self.template_text
    }

    /// Show an extracted template; the slot text becomes its hex form.
    pub fn show_template(&mut self, template: TemplateData) {
        self.template_text = template.hex();
        self.template = Some(template);
    }

    /// Clear the capture surfaces back to their waiting state.
    ///
    /// The status line is left alone; callers set it to whatever caused
    /// the clear.
    pub fn clear_capture(&mut self) {
        self.frame = None;
        self.template = None;
        self.template_text = MSG_WAITING_DATA.to_string();
    }

    /// Raise a user-visible notice.
    pub fn raise_notice(&mut self, notice: impl Into<String>) {
        let notice = notice.into();
        debug!(notice = %notice, "notice raised");
        self.notices.push(notice);
    }

    /// All raised notices, oldest first.
    #[must_use]
    pub fn notices(&self) -> &[String] {
        &self.notices
    }
}

impl Default for DisplayPanel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_starts_waiting() {
        let panel = DisplayPanel::new();
        assert_eq!(panel.status(), "Idle.");
        assert!(panel.frame().is_none());
        assert!(panel.template().is_none());
        assert_eq!(panel.template_text(), MSG_WAITING_DATA);
        assert!(panel.notices().is_empty());
    }

    #[test]
    fn test_show_template_sets_slot_text() {
        let mut panel = DisplayPanel::new();
        let template = TemplateData::new(vec![0xDE, 0xAD]).unwrap();

        panel.show_template(template);
        assert_eq!(panel.template_text(), "DEAD");
        assert!(panel.template().is_some());
    }

    #[test]
    fn test_clear_capture_resets_slots_but_not_status() {
        let mut panel = DisplayPanel::new();
        panel.set_status("Template extracted.");
        panel.show_frame(FrameData::new(vec![0u8; 4], 2, 2).unwrap());
        panel.show_template(TemplateData::new(vec![1]).unwrap());

        panel.clear_capture();

        assert!(panel.frame().is_none());
        assert!(panel.template().is_none());
        assert_eq!(panel.template_text(), MSG_WAITING_DATA);
        assert_eq!(panel.status(), "Template extracted.");
    }

    #[test]
    fn test_notices_accumulate_in_order() {
        let mut panel = DisplayPanel::new();
        panel.raise_notice("Scanner attached");
        panel.raise_notice("Data extracted");
        assert_eq!(panel.notices(), ["Scanner attached", "Data extracted"]);
    }
}
