//! Off-screen stage for markup rendering.
//!
//! Every markup render mounts a [`Container`] sized to the field box and
//! styled from the field's resolved style. The [`ContainerGuard`] returned
//! by [`OffscreenStage::mount`] unmounts it when dropped, so a container
//! never outlives its render, whether that render succeeded, failed or
//! panicked.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::style::{ResolvedStyle, Rgba, Shadow, TextAlign};

/// Styles applied to a mounted container.
///
/// Markup fields never get a stroke, so there is no stroke here.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerStyle {
    pub font_family: String,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: Rgba,
    pub text_align: TextAlign,
    /// Absolute line height in pixels, or `None` for the face's own spacing.
    pub line_height: Option<f32>,
    pub text_shadow: Option<Shadow>,
}

impl ContainerStyle {
    pub fn from_resolved(style: &ResolvedStyle) -> Self {
        Self {
            font_family: style.font_family.clone(),
            font_size: style.font_size,
            bold: style.bold,
            italic: style.italic,
            color: style.color,
            text_align: style.text_align,
            line_height: style.explicit_line_height(),
            text_shadow: style.shadow(),
        }
    }
}

/// A fixed-size box on the stage. Content is clipped to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub id: u64,
    pub width: u32,
    pub height: u32,
    pub style: ContainerStyle,
}

#[derive(Debug, Default)]
struct StageInner {
    next_id: u64,
    mounted: HashMap<u64, (u32, u32)>,
}

/// Registry of currently mounted containers.
#[derive(Debug, Clone, Default)]
pub struct OffscreenStage {
    inner: Arc<Mutex<StageInner>>,
}

impl OffscreenStage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StageInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mount a container; it stays mounted until the guard is dropped.
    pub fn mount(&self, width: u32, height: u32, style: ContainerStyle) -> ContainerGuard {
        let id = {
            let mut inner = self.lock();
            inner.next_id += 1;
            let id = inner.next_id;
            inner.mounted.insert(id, (width, height));
            id
        };
        tracing::trace!(id, width, height, "mounted container");
        ContainerGuard {
            stage: self.clone(),
            container: Container {
                id,
                width,
                height,
                style,
            },
        }
    }

    fn unmount(&self, id: u64) {
        self.lock().mounted.remove(&id);
        tracing::trace!(id, "unmounted container");
    }

    /// Number of containers currently mounted.
    pub fn mounted(&self) -> usize {
        self.lock().mounted.len()
    }
}

/// Owns a mounted container and removes it from the stage on drop.
#[derive(Debug)]
pub struct ContainerGuard {
    stage: OffscreenStage,
    container: Container,
}

impl Deref for ContainerGuard {
    type Target = Container;

    fn deref(&self) -> &Container {
        &self.container
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        self.stage.unmount(self.container.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_unmounts_on_drop() {
        let stage = OffscreenStage::new();
        let style = ContainerStyle::from_resolved(&ResolvedStyle::default());
        {
            let a = stage.mount(100, 50, style.clone());
            let b = stage.mount(10, 10, style);
            assert_eq!(stage.mounted(), 2);
            assert_ne!(a.id, b.id);
            assert_eq!((a.width, a.height), (100, 50));
        }
        assert_eq!(stage.mounted(), 0);
    }

    #[test]
    fn test_guard_unmounts_on_panic() {
        let stage = OffscreenStage::new();
        let cloned = stage.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = cloned.mount(
                1,
                1,
                ContainerStyle::from_resolved(&ResolvedStyle::default()),
            );
            panic!("render blew up");
        });
        assert!(result.is_err());
        assert_eq!(stage.mounted(), 0);
    }

    #[test]
    fn test_container_style_from_resolved() {
        let mut resolved = ResolvedStyle::default();
        resolved.text_stroke = true;
        resolved.text_shadow = true;
        resolved.line_height_multiplier = Some(1.5);
        resolved.font_size = 20.0;
        let style = ContainerStyle::from_resolved(&resolved);
        assert_eq!(style.line_height, Some(30.0));
        assert!(style.text_shadow.is_some());
    }
}
