#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::too_many_lines)]

//! Software renderer for Minecraft block and item models.
//!
//! Feeds a model identifier and item data through the Asset Namespace
//! Registry, Model Resolver, Texture Repository, Mesh Builder, Transform
//! Stack, and Rasterizer, and emits a deterministic resource fingerprint
//! alongside the rendered image (see [`renderer::Renderer`]).

pub mod animation;
pub mod assets;
pub mod error;
pub mod fingerprint;
pub mod item;
pub mod mesh;
pub mod model;
pub mod nbt;
pub mod options;
pub mod raster;
pub mod registry;
pub mod renderer;
pub mod skull;
pub mod texture;
pub mod transform;

pub use error::{RenderError, Result, Warning};
pub use item::{ItemModelContext, ItemRegistry, Predicate, SelectorNode};
pub use nbt::{ItemComponents, ItemStack, NbtTag};
pub use options::{BackgroundColor, BiomeKind, RenderOptions, View};
pub use renderer::{AnimatedRenderResult, DebugModelInfo, Frame, RenderResult, Renderer, ResourceId};
