//! SeaORM entity models
//!
//! Read-only views of the journal tables the export services project from.

mod published_article;
mod manuscript;
mod manuscript_author;
mod issue;

pub use published_article::{
    Entity as PublishedArticleEntity,
    Model as PublishedArticle,
    Column as PublishedArticleColumn,
};

pub use manuscript::{
    Entity as ManuscriptEntity,
    Model as Manuscript,
    Column as ManuscriptColumn,
};

pub use manuscript_author::{
    Entity as ManuscriptAuthorEntity,
    Model as ManuscriptAuthor,
    Column as ManuscriptAuthorColumn,
};

pub use issue::{
    Entity as IssueEntity,
    Model as Issue,
    Column as IssueColumn,
};
