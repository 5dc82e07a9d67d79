//! Relationship factories available on every model
//!
//! Each call builds a fresh relation narrowed to `self`. The plain forms use
//! the default naming conventions; the `_with` forms take explicit keys.

use crate::model::Model;
use crate::naming;

use super::belongs_to::BelongsTo;
use super::belongs_to_many::BelongsToMany;
use super::has_many::HasMany;
use super::has_one::HasOne;

/// Relationship constructors for models
pub trait HasRelationships: Model {
    /// `related.<self>_id = self.id`
    fn has_one<R: Model>(&self) -> HasOne<R> {
        self.has_one_with(&naming::foreign_key(Self::model_name()), Self::primary_key_name())
    }

    fn has_one_with<R: Model>(&self, foreign_key: &str, local_key: &str) -> HasOne<R> {
        HasOne::new(self, foreign_key, local_key)
    }

    /// `related.<self>_id = self.id`
    fn has_many<R: Model>(&self) -> HasMany<R> {
        self.has_many_with(&naming::foreign_key(Self::model_name()), Self::primary_key_name())
    }

    fn has_many_with<R: Model>(&self, foreign_key: &str, local_key: &str) -> HasMany<R> {
        HasMany::new(self, foreign_key, local_key)
    }

    /// `owner.id = self.<owner>_id`
    fn belongs_to<R: Model>(&self) -> BelongsTo<R> {
        self.belongs_to_with(&naming::foreign_key(R::model_name()), R::primary_key_name())
    }

    fn belongs_to_with<R: Model>(&self, foreign_key: &str, owner_key: &str) -> BelongsTo<R> {
        BelongsTo::new(self, foreign_key, owner_key)
    }

    /// Pivot named after both models, e.g. `Post` and `Tag` -> `post_tag (post_id, tag_id)`
    fn belongs_to_many<R: Model>(&self) -> BelongsToMany<R> {
        self.belongs_to_many_with(
            &naming::pivot_table(Self::model_name(), R::model_name()),
            &naming::foreign_key(Self::model_name()),
            &naming::foreign_key(R::model_name()),
        )
    }

    fn belongs_to_many_with<R: Model>(
        &self,
        pivot_table: &str,
        foreign_pivot_key: &str,
        related_pivot_key: &str,
    ) -> BelongsToMany<R> {
        BelongsToMany::new(
            self,
            pivot_table,
            foreign_pivot_key,
            related_pivot_key,
            Self::primary_key_name(),
            R::primary_key_name(),
        )
    }
}

impl<T: Model> HasRelationships for T {}
