//! Composable predicates that gate route selection.
//!
//! A [`Filter`] decides whether a route applies to a given update.
//! Returning `Ok(false)` skips the route silently and evaluation moves on;
//! returning an error aborts dispatch for that update, and the error
//! surfaces unchanged to the acquisition loop. Filters are stateless with
//! respect to the update and never mutate it.
//!
//! Built-ins cover the common cases:
//!
//! - [`chat_type`] matches the originating chat's category
//! - [`Command`] matches a leading command token in message text
//! - [`all`] / [`any`] / [`not`] compose child filters, evaluated left to
//!   right with short-circuiting
//! - [`filter_fn`] adapts a synchronous closure
//!
//! Predicates that need to await something implement the trait directly.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::context::Cx;
use crate::error::FilterResult;
use crate::update::ChatType;

/// A predicate over one dispatch context.
pub trait Filter: Send + Sync {
    /// Decides whether the guarded route applies to this update.
    fn allow<'a>(&'a self, cx: &'a Cx) -> BoxFuture<'a, FilterResult>;
}

/// A cheaply clonable, type-erased filter.
pub type BoxedFilter = Arc<dyn Filter>;

// ============================================================================
// Closure adapter
// ============================================================================

/// Adapter implementing [`Filter`] for a synchronous closure.
pub struct FilterFn<F>(F);

impl<F> Filter for FilterFn<F>
where
    F: Fn(&Cx) -> FilterResult + Send + Sync,
{
    fn allow<'a>(&'a self, cx: &'a Cx) -> BoxFuture<'a, FilterResult> {
        Box::pin(std::future::ready((self.0)(cx)))
    }
}

/// Creates a filter from a synchronous closure.
///
/// # Example
///
/// ```rust,ignore
/// let from_admin = filter_fn(|cx| Ok(cx.update().from().map(|u| u.id) == Some(ADMIN_ID)));
/// ```
pub fn filter_fn<F>(f: F) -> FilterFn<F>
where
    F: Fn(&Cx) -> FilterResult + Send + Sync,
{
    FilterFn(f)
}

// ============================================================================
// Combinators
// ============================================================================

/// Matches when every child filter allows.
///
/// Children are evaluated left to right; the first `Ok(false)` or error
/// short-circuits.
pub struct All(Vec<BoxedFilter>);

/// Combines filters with logical AND.
pub fn all<I>(filters: I) -> All
where
    I: IntoIterator<Item = BoxedFilter>,
{
    All(filters.into_iter().collect())
}

impl Filter for All {
    fn allow<'a>(&'a self, cx: &'a Cx) -> BoxFuture<'a, FilterResult> {
        Box::pin(async move {
            for filter in &self.0 {
                if !filter.allow(cx).await? {
                    return Ok(false);
                }
            }
            Ok(true)
        })
    }
}

/// Matches when at least one child filter allows.
///
/// Children are evaluated left to right; the first `Ok(true)` or error
/// short-circuits.
pub struct Any(Vec<BoxedFilter>);

/// Combines filters with logical OR.
pub fn any<I>(filters: I) -> Any
where
    I: IntoIterator<Item = BoxedFilter>,
{
    Any(filters.into_iter().collect())
}

impl Filter for Any {
    fn allow<'a>(&'a self, cx: &'a Cx) -> BoxFuture<'a, FilterResult> {
        Box::pin(async move {
            for filter in &self.0 {
                if filter.allow(cx).await? {
                    return Ok(true);
                }
            }
            Ok(false)
        })
    }
}

/// Inverts a child filter. Errors pass through uninverted.
pub struct Not(BoxedFilter);

/// Negates a filter.
pub fn not<F>(filter: F) -> Not
where
    F: Filter + 'static,
{
    Not(Arc::new(filter))
}

impl Filter for Not {
    fn allow<'a>(&'a self, cx: &'a Cx) -> BoxFuture<'a, FilterResult> {
        Box::pin(async move { Ok(!self.0.allow(cx).await?) })
    }
}

// ============================================================================
// Chat type
// ============================================================================

/// Matches updates originating from one of the given chat categories.
///
/// Updates without an originating chat (inline queries, polls) never match.
pub struct ChatTypeFilter {
    kinds: Vec<ChatType>,
}

/// Matches the update's chat category against `kinds`.
pub fn chat_type<I>(kinds: I) -> ChatTypeFilter
where
    I: IntoIterator<Item = ChatType>,
{
    ChatTypeFilter {
        kinds: kinds.into_iter().collect(),
    }
}

impl Filter for ChatTypeFilter {
    fn allow<'a>(&'a self, cx: &'a Cx) -> BoxFuture<'a, FilterResult> {
        let matched = cx
            .update()
            .chat()
            .map(|chat| self.kinds.contains(&chat.kind))
            .unwrap_or(false);
        Box::pin(std::future::ready(Ok(matched)))
    }
}

// ============================================================================
// Command
// ============================================================================

/// Matches a leading command token in message text.
///
/// A command is the first whitespace-separated token, introduced by the
/// prefix character and optionally suffixed with a `@botname` mention:
/// `/start`, `/start@my_bot`, `/start arg1 arg2`.
///
/// Matching is case-insensitive by default. When a bot username is set,
/// mentions addressed to a different bot are rejected; without one, any
/// mention is accepted.
///
/// # Example
///
/// ```rust,ignore
/// Route::on(UpdateKind::Message)
///     .filter(Command::new("start").alias("help").username("my_bot"))
///     .handler(on_start)
/// ```
pub struct Command {
    name: String,
    aliases: Vec<String>,
    prefix: char,
    ignore_case: bool,
    username: Option<String>,
}

impl Command {
    /// Creates a command filter for `name` with the default `/` prefix.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            prefix: '/',
            ignore_case: true,
            username: None,
        }
    }

    /// Adds an alternative name that also matches.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Overrides the prefix character.
    pub fn prefix(mut self, prefix: char) -> Self {
        self.prefix = prefix;
        self
    }

    /// Makes matching case-sensitive.
    pub fn case_sensitive(mut self) -> Self {
        self.ignore_case = false;
        self
    }

    /// Sets the bot username used to validate `@botname` mentions.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    fn matches(&self, text: &str) -> bool {
        let Some(first) = text.split_whitespace().next() else {
            return false;
        };
        let Some(rest) = first.strip_prefix(self.prefix) else {
            return false;
        };

        let command = match rest.split_once('@') {
            Some((command, mention)) => {
                if let Some(expected) = &self.username
                    && !mention.eq_ignore_ascii_case(expected)
                {
                    return false;
                }
                command
            }
            None => rest,
        };

        std::iter::once(self.name.as_str())
            .chain(self.aliases.iter().map(String::as_str))
            .any(|candidate| {
                if self.ignore_case {
                    command.eq_ignore_ascii_case(candidate)
                } else {
                    command == candidate
                }
            })
    }
}

impl Filter for Command {
    fn allow<'a>(&'a self, cx: &'a Cx) -> BoxFuture<'a, FilterResult> {
        let matched = cx.update().text().map(|t| self.matches(t)).unwrap_or(false);
        Box::pin(std::future::ready(Ok(matched)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Api;
    use crate::update::{Chat, Message, Update, UpdatePayload};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    struct NullApi;

    #[async_trait]
    impl Api for NullApi {
        async fn call(&self, _method: &str, _params: Value) -> Result<Value, crate::BoxError> {
            Ok(Value::Null)
        }
    }

    fn message_cx(chat_kind: ChatType, text: &str) -> Cx {
        let update = Update {
            id: 1,
            payload: UpdatePayload::Message(Message {
                id: 1,
                chat: Chat {
                    id: 10,
                    kind: chat_kind,
                    title: None,
                    username: None,
                },
                from: None,
                text: Some(text.to_string()),
            }),
        };
        Cx::new(update, Arc::new(NullApi), CancellationToken::new())
    }

    /// Filter that counts evaluations before returning a fixed verdict.
    struct Counted {
        verdict: bool,
        calls: Arc<AtomicUsize>,
    }

    impl Filter for Counted {
        fn allow<'a>(&'a self, _cx: &'a Cx) -> BoxFuture<'a, FilterResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(std::future::ready(Ok(self.verdict)))
        }
    }

    #[tokio::test]
    async fn command_matches_with_args_and_mention() {
        let cx = message_cx(ChatType::Private, "/start@my_bot now");
        let filter = Command::new("start").username("my_bot");
        assert!(filter.allow(&cx).await.unwrap());

        let wrong_bot = Command::new("start").username("other_bot");
        assert!(!wrong_bot.allow(&cx).await.unwrap());
    }

    #[tokio::test]
    async fn command_ignores_case_by_default() {
        let cx = message_cx(ChatType::Private, "/START");
        assert!(Command::new("start").allow(&cx).await.unwrap());
        assert!(
            !Command::new("start")
                .case_sensitive()
                .allow(&cx)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn command_requires_prefix() {
        let cx = message_cx(ChatType::Private, "start");
        assert!(!Command::new("start").allow(&cx).await.unwrap());
    }

    #[tokio::test]
    async fn command_alias_matches() {
        let cx = message_cx(ChatType::Private, "/help");
        assert!(Command::new("start").alias("help").allow(&cx).await.unwrap());
    }

    #[tokio::test]
    async fn chat_type_matches_category() {
        let cx = message_cx(ChatType::Group, "hello");
        assert!(
            chat_type([ChatType::Group, ChatType::Supergroup])
                .allow(&cx)
                .await
                .unwrap()
        );
        assert!(!chat_type([ChatType::Private]).allow(&cx).await.unwrap());
    }

    #[tokio::test]
    async fn any_short_circuits_after_first_match() {
        let cx = message_cx(ChatType::Private, "x");
        let calls = Arc::new(AtomicUsize::new(0));

        let combined = any([
            Arc::new(Counted {
                verdict: true,
                calls: Arc::clone(&calls),
            }) as BoxedFilter,
            Arc::new(Counted {
                verdict: true,
                calls: Arc::clone(&calls),
            }) as BoxedFilter,
        ]);

        assert!(combined.allow(&cx).await.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_short_circuits_after_first_rejection() {
        let cx = message_cx(ChatType::Private, "x");
        let calls = Arc::new(AtomicUsize::new(0));

        let combined = all([
            Arc::new(Counted {
                verdict: false,
                calls: Arc::clone(&calls),
            }) as BoxedFilter,
            Arc::new(Counted {
                verdict: true,
                calls: Arc::clone(&calls),
            }) as BoxedFilter,
        ]);

        assert!(!combined.allow(&cx).await.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn not_inverts_verdict_but_propagates_errors() {
        let cx = message_cx(ChatType::Private, "x");
        assert!(!not(filter_fn(|_| Ok(true))).allow(&cx).await.unwrap());

        let failing = not(filter_fn(|_| Err("broken predicate".into())));
        assert!(failing.allow(&cx).await.is_err());
    }
}
