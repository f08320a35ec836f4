//! Permit form overlay editor.
//!
//! Loads a blank permit form for a city, lays editable text, checkbox and
//! line layers over its rasterized pages, fills them from the company profile
//! and the current job, and sends the result back to the permit service as a
//! company override. The core is headless and runs natively (CLI, tests);
//! the `browser` feature adds the DOM surface and a wasm-bindgen wrapper.
//!
//! Layers live in raster space (top-left origin, scaled pixels) while the
//! editor runs, and in document space (bottom-left origin, PDF points) on the
//! wire. Only [`transform`] and [`persist`] convert between the two.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | Headless editor state [`session::EditorCore`] and its actions |
//! | [`layer`] | Layer model, normalization and patches |
//! | [`store`] | Ordered layer store with selection |
//! | [`transform`] | Raster/document coordinate conversion |
//! | [`viewport`] | Current page, page count and the rasterizer seam |
//! | [`render`] | Overlay projection, surfaces and the layer list |
//! | [`hit`] | Hit-testing overlay nodes |
//! | [`drag`] | Pointer drag state machine |
//! | [`panel`] | Property panel binding |
//! | [`fields`] | Field resolution and standard layer provisioning |
//! | [`context`] | Session context, job data and the form catalog |
//! | [`preset`] | Named per-document layer presets |
//! | [`persist`] | Wire format and the override payload |
//! | [`packet`] | Packet generation requests and results |
//! | [`api`] | HTTP client for the permit service |
//! | [`loader`] | Document loading |
//! | [`storage`] | Scoped key/value persistence |
//! | [`config`] | API and editor configuration |
//! | [`error`] | Editor error type |
//! | [`consts`] | Shared constants (default sizes, layer keys, grid) |
//! | `dom`, `browser` | DOM surface and JavaScript wrapper (`browser` feature) |

pub mod api;
pub mod config;
pub mod consts;
pub mod context;
pub mod drag;
pub mod error;
pub mod fields;
pub mod hit;
pub mod layer;
pub mod loader;
pub mod packet;
pub mod panel;
pub mod persist;
pub mod preset;
pub mod render;
pub mod session;
pub mod storage;
pub mod store;
pub mod transform;
pub mod viewport;

#[cfg(feature = "browser")]
pub mod browser;
#[cfg(feature = "browser")]
pub mod dom;
