//! Mark content: what the overlay's mark node renders. Rebuilt from
//! scratch on every configuration change, mirroring how the host is
//! expected to replace the mark's children wholesale.

use crate::geometry::Size;
use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq)]
pub struct TextSpec {
    pub text: String,
    pub color: String,
    pub opacity: f64,
    pub font_size: f64,
    pub font_family: String,
    pub shadow: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageSpec {
    /// Data-URI payload handed straight to the host's image node.
    pub source: String,
    pub opacity: f64,
    /// Explicit display size, natural pixel dimensions times the scale
    /// factors. `None` until the natural size is known; the host shows
    /// the image unsized and the controller re-renders on load.
    pub display: Option<Size>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarkContent {
    pub text: Option<TextSpec>,
    pub image: Option<ImageSpec>,
}

impl MarkContent {
    /// Derive the mark's children from the configuration. The image child
    /// appears only when the mode asks for it AND a payload is present;
    /// the text child whenever the mode asks for it.
    pub fn from_settings(settings: &Settings, natural_size: Option<Size>) -> Self {
        let image = if settings.content_mode.shows_image() && !settings.image_data.is_empty() {
            Some(ImageSpec {
                source: settings.image_data.clone(),
                opacity: settings.image_opacity,
                display: natural_size.map(|natural| image_display_size(settings, natural)),
            })
        } else {
            None
        };

        let text = if settings.content_mode.shows_text() {
            Some(TextSpec {
                text: settings.text.clone(),
                color: settings.color.clone(),
                opacity: settings.opacity,
                font_size: settings.font_size,
                font_family: settings.font_family.clone(),
                shadow: settings.shadow,
            })
        } else {
            None
        };

        Self { text, image }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.image.is_none()
    }
}

/// Natural pixel dimensions times the configured scale factors. With
/// `image_maintain_ratio` the Y scale mirrors X.
pub fn image_display_size(settings: &Settings, natural: Size) -> Size {
    let scale_x = settings.image_scale_x;
    let scale_y = if settings.image_maintain_ratio {
        scale_x
    } else {
        settings.image_scale_y
    };
    Size::new(natural.width * scale_x, natural.height * scale_y)
}

#[cfg(test)]
mod tests {
    use super::{image_display_size, MarkContent};
    use crate::geometry::Size;
    use crate::settings::{ContentMode, Settings};

    #[test]
    fn text_mode_omits_image_even_with_payload() {
        let mut settings = Settings::default();
        settings.image_data = "data:image/png;base64,xyz".to_owned();
        let content = MarkContent::from_settings(&settings, None);
        assert!(content.image.is_none());
        assert!(content.text.is_some());
    }

    #[test]
    fn image_mode_without_payload_renders_nothing() {
        let mut settings = Settings::default();
        settings.content_mode = ContentMode::Image;
        let content = MarkContent::from_settings(&settings, None);
        assert!(content.is_empty());
    }

    #[test]
    fn both_mode_with_payload_renders_both() {
        let mut settings = Settings::default();
        settings.content_mode = ContentMode::Both;
        settings.image_data = "data:image/png;base64,xyz".to_owned();
        let content = MarkContent::from_settings(&settings, Some(Size::new(100.0, 50.0)));
        assert!(content.text.is_some());
        let image = content.image.expect("image child");
        assert_eq!(image.display, Some(Size::new(20.0, 10.0)));
    }

    #[test]
    fn maintain_ratio_mirrors_x_scale() {
        let mut settings = Settings::default();
        settings.image_scale_x = 0.5;
        settings.image_scale_y = 2.0;
        settings.image_maintain_ratio = true;
        let size = image_display_size(&settings, Size::new(200.0, 100.0));
        assert_eq!(size, Size::new(100.0, 50.0));

        settings.image_maintain_ratio = false;
        let size = image_display_size(&settings, Size::new(200.0, 100.0));
        assert_eq!(size, Size::new(100.0, 200.0));
    }

    #[test]
    fn display_size_unknown_until_natural_size_arrives() {
        let mut settings = Settings::default();
        settings.content_mode = ContentMode::Image;
        settings.image_data = "data:image/png;base64,xyz".to_owned();
        let content = MarkContent::from_settings(&settings, None);
        assert_eq!(content.image.expect("image child").display, None);
    }
}
