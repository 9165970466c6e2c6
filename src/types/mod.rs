//! Core data types shared by the capture, classify and verify stages.

pub mod fidelity;
pub mod snapshot;
pub mod template;

pub use crate::viewport::{Breakpoint, Breakpoints, Viewport};
pub use fidelity::{
    BreakpointFidelity, FallbackInfo, FidelityDetails, FidelityReport, LayoutCapture, LayoutEntry,
    ScreenshotInfo, StructureCounts, VerifyStage,
};
pub use snapshot::{
    AssetBundle, BoxSides, BreakpointCapture, ElementNode, FontFaceAsset, FormAsset, FormField,
    ImageAsset, LinkAsset, PageMetadata, PageSnapshot, StyleSnapshot, VideoAsset,
};
pub use template::{
    Column, CustomColor, CustomFont, DocumentMetadata, ElType, LayoutCounts, PageSettings,
    Section, Settings, TemplateDocument, Widget, WidgetType, TEMPLATE_VERSION,
};
