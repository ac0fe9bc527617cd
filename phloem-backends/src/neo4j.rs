//! Request templates for the Neo4j GraphQL endpoint
//!
//! Mutations follow the Neo4j GraphQL schema style: top-level create
//! mutations plus add* relation mutations, aliased `first`/`second`/`third`
//! so one document can create an entity and wire its relations in a single
//! round trip.

use crate::text::letters;
use phloem_core::chooser::{Operation, OperationClass};
use phloem_core::{Backend, KeySpace, Result};
use rand::rngs::SmallRng;
use rand::SeedableRng;

pub struct Neo4jBackend {
    rng: SmallRng,
}

impl Neo4jBackend {
    pub fn new() -> Self {
        Self::with_seed(None)
    }

    pub fn with_seed(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => SmallRng::seed_from_u64(s),
            None => SmallRng::from_os_rng(),
        };
        Self { rng }
    }

    fn value(&mut self, len: usize) -> String {
        format!("\"{}\"", letters(&mut self.rng, len))
    }

    fn insert_mutation(&mut self, op: &Operation, key: &str, keys: &mut KeySpace) -> Result<String> {
        let segments: Vec<String> = match op.query.as_str() {
            // Transaction-phase inserts: `key` is the freshly allocated key
            // in the transactional key space
            "createSingleUser" => {
                let fields = format!(
                    "firstName: {}, lastName: {}, email: {}, password: {}",
                    self.value(6),
                    self.value(10),
                    self.value(25),
                    self.value(10)
                );
                vec![format!("first: createUser(id: \"{key}\", {fields})")]
            }
            "createAndConnectSingleLike" => vec![
                format!("first: createLike(id: \"{key}\")"),
                format!(
                    "second: addPostLikes(id: \"{}\", likes: [\"{key}\"])",
                    keys.transaction_key("post")?
                ),
                format!(
                    "third: addUserLikes(id: \"{}\", likes: [\"{key}\"])",
                    keys.transaction_key("user")?
                ),
            ],
            "createAndConnectSingleComment" => vec![
                format!("first: createComment(id: \"{key}\", content: {})", self.value(50)),
                format!(
                    "second: addPostComments(id: \"{}\", comments: [\"{key}\"])",
                    keys.transaction_key("post")?
                ),
                format!(
                    "third: addUserComments(id: \"{}\", comments: [\"{key}\"])",
                    keys.transaction_key("user")?
                ),
            ],
            // Load-phase inserts: the operation name is the table
            "user" => {
                let fields = format!(
                    "firstName: {}, lastName: {}, email: {}, password: {}",
                    self.value(6),
                    self.value(10),
                    self.value(25),
                    self.value(10)
                );
                vec![format!("first: createUser(id: \"{key}\", {fields})")]
            }
            "post" => vec![
                format!("first: createPost(id: \"{key}\", content: {})", self.value(200)),
                format!(
                    "second: addUserPosts(id: \"{}\", posts: [\"{key}\"])",
                    keys.transaction_key("user")?
                ),
            ],
            "comment" => vec![
                format!("first: createComment(id: \"{key}\", content: {})", self.value(50)),
                format!(
                    "second: addPostComments(id: \"{}\", comments: [\"{key}\"])",
                    keys.transaction_key("post")?
                ),
                format!(
                    "third: addUserComments(id: \"{}\", comments: [\"{key}\"])",
                    keys.transaction_key("user")?
                ),
            ],
            "like" => vec![
                format!("first: createLike(id: \"{key}\")"),
                format!(
                    "second: addPostLikes(id: \"{}\", likes: [\"{key}\"])",
                    keys.transaction_key("post")?
                ),
                format!(
                    "third: addUserLikes(id: \"{}\", likes: [\"{key}\"])",
                    keys.transaction_key("user")?
                ),
            ],
            "group" => {
                let fields =
                    format!("topic: {}, description: {}", self.value(10), self.value(100));
                vec![format!("first: createGroup(id: \"{key}\", {fields})")]
            }
            "friendship" => vec![format!(
                "first: addUserFriendWith(id: \"{}\", friendWith: [\"{}\"])",
                keys.transaction_key("user")?,
                keys.transaction_key("user")?
            )],
            other => {
                tracing::debug!(operation = other, "no neo4j insert template, sending empty document");
                Vec::new()
            }
        };
        Ok(format!("mutation{{{}}}", segments.join(" ")))
    }

    fn update_mutation(&mut self, op: &Operation, key: &str, keys: &mut KeySpace) -> Result<String> {
        let segment = match op.query.as_str() {
            "updateUserByIdSetFriendWith" => format!(
                "first: addUserFriendWith(id: \"{key}\", friendWith: [\"{}\"])",
                keys.transaction_key("user")?
            ),
            "updatePostByIdSetContent" => {
                format!("first: mergePost(id: \"{key}\", content: {})", self.value(300))
            }
            "updateCommentByIdSetContent" => {
                format!("first: mergeComment(id: \"{key}\", content: {})", self.value(150))
            }
            other => {
                tracing::debug!(operation = other, "no neo4j update template, sending empty document");
                String::new()
            }
        };
        Ok(format!("mutation{{{segment}}}"))
    }
}

impl Default for Neo4jBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for Neo4jBackend {
    fn name(&self) -> &'static str {
        "neo4j"
    }

    fn error_marker(&self) -> &'static str {
        "\"errors\":[{"
    }

    fn build_query(&mut self, op: &Operation, key: &str) -> String {
        let (name, fields) = match op.query.as_str() {
            "userByIdWithPostsAndCommentsAndAuthors" => (
                "User",
                "{firstName, lastName, posts {content, author {firstName, lastName}, \
                 comments {content, author {firstName, lastName}}}}",
            ),
            "groupByIdWithMemberIds" => {
                ("Group", "{topic, description, members {firstName, lastName}}")
            }
            "postByIdWithFirstTenComments" => {
                ("Post", "{content, comments(first: 10) {id, content}}")
            }
            other => {
                tracing::debug!(operation = other, "no neo4j read template, sending empty document");
                ("", "")
            }
        };
        if name.is_empty() {
            "query{}".to_string()
        } else {
            format!("query{{{name}(id: \"{key}\"){fields}}}")
        }
    }

    fn build_mutation(&mut self, op: &Operation, key: &str, keys: &mut KeySpace) -> Result<String> {
        match op.class {
            OperationClass::Update => self.update_mutation(op, key, keys),
            _ => self.insert_mutation(op, key, keys),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phloem_core::config::{KeyChooserConfig, TableConfig, WorkloadConfig};
    use std::collections::BTreeMap;

    fn key_space() -> KeySpace {
        let mut tables = BTreeMap::new();
        for name in ["user", "post", "comment", "like", "group"] {
            tables.insert(
                name.to_string(),
                TableConfig { record_count: 10, keychooser: KeyChooserConfig::Uniform },
            );
        }
        let cfg = WorkloadConfig {
            tables,
            zeropadding: 3,
            insert_order: phloem_core::config::InsertOrder::Ordered,
            ..WorkloadConfig::default()
        };
        KeySpace::from_config(&cfg, Some(1)).unwrap()
    }

    fn op(class: OperationClass, query: &str, table: &str) -> Operation {
        Operation { class, query: query.to_string(), table: table.to_string() }
    }

    #[test]
    fn test_read_embeds_key() {
        let mut backend = Neo4jBackend::with_seed(Some(1));
        let doc = backend.build_query(
            &op(OperationClass::Read, "userByIdWithPostsAndCommentsAndAuthors", "user"),
            "user007",
        );
        assert!(doc.starts_with("query{User(id: \"user007\")"));
        assert!(doc.contains("posts"));
    }

    #[test]
    fn test_unknown_read_sends_empty_document() {
        let mut backend = Neo4jBackend::with_seed(Some(1));
        let doc = backend.build_query(&op(OperationClass::Read, "mystery", "user"), "user1");
        assert_eq!(doc, "query{}");
    }

    #[test]
    fn test_load_user_mutation() {
        let mut backend = Neo4jBackend::with_seed(Some(1));
        let mut keys = key_space();
        let doc = backend
            .build_mutation(&op(OperationClass::Insert, "user", "user"), "user042", &mut keys)
            .unwrap();
        assert!(doc.starts_with("mutation{first: createUser(id: \"user042\""));
        assert!(doc.contains("firstName:"));
        assert!(doc.contains("password:"));
    }

    #[test]
    fn test_load_post_connects_author() {
        let mut backend = Neo4jBackend::with_seed(Some(1));
        let mut keys = key_space();
        let doc = backend
            .build_mutation(&op(OperationClass::Insert, "post", "post"), "post005", &mut keys)
            .unwrap();
        assert!(doc.contains("createPost(id: \"post005\""));
        assert!(doc.contains("addUserPosts(id: \"user"), "author connect missing: {doc}");
        assert!(doc.contains("posts: [\"post005\"]"));
    }

    #[test]
    fn test_transaction_like_uses_allocated_key() {
        let mut backend = Neo4jBackend::with_seed(Some(1));
        let mut keys = key_space();
        let doc = backend
            .build_mutation(
                &op(OperationClass::Insert, "createAndConnectSingleLike", "like"),
                "likeX010",
                &mut keys,
            )
            .unwrap();
        assert!(doc.contains("createLike(id: \"likeX010\")"));
        assert!(doc.contains("likes: [\"likeX010\"]"));
        assert!(doc.contains("addPostLikes(id: \"post"));
        assert!(doc.contains("addUserLikes(id: \"user"));
    }

    #[test]
    fn test_update_post_content() {
        let mut backend = Neo4jBackend::with_seed(Some(1));
        let mut keys = key_space();
        let doc = backend
            .build_mutation(
                &op(OperationClass::Update, "updatePostByIdSetContent", "post"),
                "post003",
                &mut keys,
            )
            .unwrap();
        assert!(doc.starts_with("mutation{first: mergePost(id: \"post003\", content: \""));
    }

    #[test]
    fn test_value_text_deterministic_per_seed() {
        let mut keys = key_space();
        let mut a = Neo4jBackend::with_seed(Some(7));
        let doc_a = a
            .build_mutation(&op(OperationClass::Insert, "user", "user"), "user1", &mut keys)
            .unwrap();
        let mut b = Neo4jBackend::with_seed(Some(7));
        let doc_b = b
            .build_mutation(&op(OperationClass::Insert, "user", "user"), "user1", &mut keys)
            .unwrap();
        assert_eq!(doc_a, doc_b);
    }
}
