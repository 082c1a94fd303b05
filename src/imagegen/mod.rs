pub mod archive;
pub mod interface;
pub mod stable_diffusion;

pub use archive::{FsImageArchive, ImageArchive, ImageMetadata};
pub use interface::{ImageGenError, ImageProvider, ImageRequest, ImageResult};
pub use stable_diffusion::StableDiffusionProvider;
