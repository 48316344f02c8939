mod common;
mod retrieval;
