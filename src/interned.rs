use crate::catalog::MessageId;

/// Interned lookup key of a translatable message.
#[salsa::interned(debug)]
pub struct MessageKey {
    #[returns(ref)]
    pub context: String,

    #[returns(ref)]
    pub source: String,

    #[returns(ref)]
    pub comment: Option<String>,
}

impl<'db> MessageKey<'db> {
    /// Interns a catalog key.
    pub fn from_id(db: &'db dyn crate::db::I18nDatabase, id: &MessageId) -> Self {
        Self::new(db, id.context.clone(), id.source.clone(), id.comment.clone())
    }

    #[must_use]
    pub fn to_id(self, db: &'db dyn crate::db::I18nDatabase) -> MessageId {
        MessageId {
            context: self.context(db).clone(),
            source: self.source(db).clone(),
            comment: self.comment(db).clone(),
        }
    }
}
