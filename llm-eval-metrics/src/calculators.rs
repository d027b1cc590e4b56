pub mod entropy;
pub mod perplexity;
pub mod burstiness;
pub mod latency;

pub use entropy::*;
pub use perplexity::*;
pub use burstiness::*;
pub use latency::*;
