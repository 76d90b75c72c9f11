//! Messages accepted by a collection actor.

use super::ItemMap;
use crate::callback::CallbackResult;
use crate::error::{CoreError, CoreResult};
use crate::transaction::Transaction;
use crate::types::ItemId;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use valuez_codec::Value;

/// Predicate run by the actor for `take`.
pub(crate) type Predicate = Box<dyn FnMut(&Value) -> CallbackResult<bool> + Send>;

/// Update function run by the actor; `None` leaves the item unchanged.
pub(crate) type UpdateFn = Box<dyn FnMut(&Value) -> CallbackResult<Option<Value>> + Send>;

/// Transaction body; the returned flag is the commit decision.
pub(crate) type TransactionBody = Box<dyn FnOnce(&mut Transaction) -> CallbackResult<bool> + Send>;

/// Reply side of a single request.
pub(crate) type Reply<T> = Sender<CoreResult<T>>;

/// Creates the one-shot channel a caller waits on.
pub(crate) fn reply_channel<T>() -> (Reply<T>, Receiver<CoreResult<T>>) {
    mpsc::channel()
}

pub(crate) enum Request {
    Put {
        value: Value,
        reply: Reply<ItemId>,
    },
    Take {
        predicate: Predicate,
        reply: Reply<Vec<Value>>,
    },
    Update {
        func: UpdateFn,
        reply: Reply<bool>,
    },
    Transaction {
        body: TransactionBody,
        reply: Reply<bool>,
    },
    View {
        reply: Reply<Arc<ItemMap>>,
    },
    AsList {
        reply: Reply<Arc<Vec<Value>>>,
    },
    Delete {
        reply: Reply<()>,
    },
    /// Sent by the database on close; carries no reply.
    Shutdown,
}

impl Request {
    /// Answers the request with an error without running it.
    pub(crate) fn reject(self, err: CoreError) {
        // A caller that gave up waiting is not an error here.
        match self {
            Self::Put { reply, .. } => drop(reply.send(Err(err))),
            Self::Take { reply, .. } => drop(reply.send(Err(err))),
            Self::Update { reply, .. } | Self::Transaction { reply, .. } => {
                drop(reply.send(Err(err)));
            }
            Self::View { reply } => drop(reply.send(Err(err))),
            Self::AsList { reply } => drop(reply.send(Err(err))),
            Self::Delete { reply } => drop(reply.send(Err(err))),
            Self::Shutdown => {}
        }
    }

    /// Short name for logs.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Put { .. } => "put",
            Self::Take { .. } => "take",
            Self::Update { .. } => "update",
            Self::Transaction { .. } => "transaction",
            Self::View { .. } => "view",
            Self::AsList { .. } => "as-list",
            Self::Delete { .. } => "delete",
            Self::Shutdown => "shutdown",
        }
    }
}
