/// Latent Dirichlet Allocation over `features` datasets of term counts.
///
/// ```text
///   Dataset ──► corpus (sparse counts, width check)
///                  │
///                  ▼
///          ┌───────────────┐
///          │  optimizer     │  online VB (default) or collapsed Gibbs
///          └───────────────┘
///                  │  λ (topics × terms), α
///                  ▼
///          ┌───────────────┐
///          │  LdaModel      │  log_likelihood / log_perplexity /
///          └───────────────┘  describe_topics / transform
/// ```

mod corpus;
mod error;
mod gibbs;
mod inference;
mod model;
mod online;
mod params;
pub mod special;
mod trainer;

pub use error::LdaError;
pub use model::{LdaModel, TopicTerms};
pub use params::{LdaParams, Optimizer};
pub use trainer::Lda;
