pub mod cli;
pub mod data;
pub mod lda;
pub mod report;
pub mod session;
