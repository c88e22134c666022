pub mod http;
pub mod traits;

pub use http::HttpGenerationApi;
pub use traits::GenerationApi;
