//! Request templates for the Prisma GraphQL endpoint
//!
//! Prisma's generated CRUD API takes a single `data` argument with nested
//! `connect` blocks for relations, and `where` filters for lookups and
//! updates. Transaction-phase creates let the server generate the id, so
//! the allocated key is only embedded for load-phase inserts; relation
//! targets are still drawn from the transaction-time key space.

use crate::text::letters;
use phloem_core::chooser::{Operation, OperationClass};
use phloem_core::{Backend, KeySpace, Result};
use rand::rngs::SmallRng;
use rand::SeedableRng;

pub struct PrismaBackend {
    rng: SmallRng,
}

impl PrismaBackend {
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

    fn user_fields(&mut self, age: u32) -> String {
        format!(
            "firstName: {}, lastName: {}, email: {}, password: {}, age: {age}",
            self.value(6),
            self.value(10),
            self.value(25),
            self.value(10)
        )
    }

    fn compose(mutation: &str, filter: &str, data: &str) -> String {
        format!("mutation{{{mutation}({filter} data:{{{data}}}){{id}}}}")
    }

    fn insert_mutation(&mut self, op: &Operation, key: &str, keys: &mut KeySpace) -> Result<String> {
        let load_id = format!("id: \"{key}\", ");
        let (mutation, filter, data) = match op.query.as_str() {
            // Transaction-phase creates: the server assigns the id
            "createSingleUser" => ("createUser", String::new(), self.user_fields(25)),
            "createAndConnectSingleLike" => (
                "createLike",
                String::new(),
                format!(
                    "post: {{connect: {{id: \"{}\"}}}}, user: {{connect: {{id: \"{}\"}}}}",
                    keys.transaction_key("post")?,
                    keys.transaction_key("user")?
                ),
            ),
            "createAndConnectSingleComment" => (
                "createComment",
                String::new(),
                format!(
                    "content: {}, author: {{connect: {{id: \"{}\"}}}}, \
                     post: {{connect: {{id: \"{}\"}}}}",
                    self.value(50),
                    keys.transaction_key("user")?,
                    keys.transaction_key("post")?
                ),
            ),
            // Load-phase inserts carry the allocated key as the id
            "user" => ("createUser", String::new(), format!("{load_id}{}", self.user_fields(32))),
            "post" => (
                "createPost",
                String::new(),
                format!(
                    "{load_id}content: {}, author: {{connect: {{id: \"{}\"}}}}",
                    self.value(200),
                    keys.transaction_key("user")?
                ),
            ),
            "comment" => (
                "createComment",
                String::new(),
                format!(
                    "{load_id}content: {}, author: {{connect: {{id: \"{}\"}}}}, \
                     post: {{connect: {{id: \"{}\"}}}}",
                    self.value(50),
                    keys.transaction_key("user")?,
                    keys.transaction_key("post")?
                ),
            ),
            "like" => (
                "createLike",
                String::new(),
                format!(
                    "{load_id}post: {{connect: {{id: \"{}\"}}}}, \
                     user: {{connect: {{id: \"{}\"}}}}",
                    keys.transaction_key("post")?,
                    keys.transaction_key("user")?
                ),
            ),
            "group" => (
                "createGroup",
                String::new(),
                format!(
                    "{load_id}topic: {}, description: {}",
                    self.value(10),
                    self.value(100)
                ),
            ),
            "friendship" => (
                "updateUser",
                format!("where: {{id: \"{}\"}}", keys.transaction_key("user")?),
                format!(
                    "friendOf: {{connect: {{id: \"{}\"}}}}",
                    keys.transaction_key("user")?
                ),
            ),
            other => {
                tracing::debug!(operation = other, "no prisma insert template, sending empty document");
                ("", String::new(), String::new())
            }
        };
        Ok(Self::compose(mutation, &filter, &data))
    }

    fn update_mutation(&mut self, op: &Operation, key: &str, keys: &mut KeySpace) -> Result<String> {
        let filter = format!("where: {{id: \"{key}\"}}");
        let (mutation, data) = match op.query.as_str() {
            "updateUserByIdSetFriendWith" => (
                "updateUser",
                format!(
                    "friendWith: {{connect: {{id: \"{}\"}}}}",
                    keys.transaction_key("user")?
                ),
            ),
            "updatePostByIdSetContent" => {
                ("updatePost", format!("content: {}", self.value(300)))
            }
            "updateCommentByIdSetContent" => {
                ("updateComment", format!("content: {}", self.value(150)))
            }
            other => {
                tracing::debug!(operation = other, "no prisma update template, sending empty document");
                ("", String::new())
            }
        };
        Ok(Self::compose(mutation, &filter, &data))
    }
}

impl Default for PrismaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for PrismaBackend {
    fn name(&self) -> &'static str {
        "prisma"
    }

    fn error_marker(&self) -> &'static str {
        "\"errors\" : [ {"
    }

    fn build_query(&mut self, op: &Operation, key: &str) -> String {
        let (name, fields) = match op.query.as_str() {
            "userByIdWithPostsAndCommentsAndAuthors" => (
                "user",
                "{firstName, lastName, age, posts {content, author {firstName, lastName}, \
                 comments {content, author {firstName, lastName}}}}",
            ),
            "groupByIdWithMemberIds" => {
                ("group", "{topic, description, members {firstName, lastName}}")
            }
            "postByIdWithFirstTenComments" => {
                ("post", "{content, comments(first: 10) {id, content}}")
            }
            other => {
                tracing::debug!(operation = other, "no prisma read template, sending empty document");
                ("", "")
            }
        };
        if name.is_empty() {
            "query{}".to_string()
        } else {
            format!("query{{{name}(where: {{id: \"{key}\"}}){fields}}}")
        }
    }

    fn build_mutation(&mut self, op: &Operation, key: &str, keys: &mut KeySpace) -> Result<String> {
        match op.class {
            OperationClass::Update => self.update_mutation(op, key, keys),
            _ => self.insert_mutation(op, key, keys),
        }
    }
}
