//! Tests for markdown segmentation, inline formatting and rendering.

mod render;
