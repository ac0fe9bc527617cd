//! Backend request-template strategies
//!
//! Each backend dialect implements [`phloem_core::Backend`]: given an
//! operation and its resolved key(s), it produces the GraphQL document to
//! send. The engine stays generic; everything dialect-specific — query
//! shapes, mutation nesting, the embedded error marker — lives here.

mod text;

pub mod neo4j;
pub mod prisma;

pub use neo4j::Neo4jBackend;
pub use prisma::PrismaBackend;

use phloem_core::Backend;

/// Create a backend strategy by name.
pub fn create_backend(name: &str, seed: Option<u64>) -> anyhow::Result<Box<dyn Backend>> {
    match name {
        "neo4j" => Ok(Box::new(Neo4jBackend::with_seed(seed))),
        "prisma" => Ok(Box::new(PrismaBackend::with_seed(seed))),
        other => anyhow::bail!("unknown backend: {other} (expected neo4j or prisma)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_backend_by_name() {
        assert_eq!(create_backend("neo4j", Some(1)).unwrap().name(), "neo4j");
        assert_eq!(create_backend("prisma", Some(1)).unwrap().name(), "prisma");
        assert!(create_backend("mystery", None).is_err());
    }
}
