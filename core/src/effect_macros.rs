//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating `Effect` variants from
//! reducers, which mostly return store calls wrapped in futures.

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use tasklist_core::async_effect;
///
/// async_effect! {
///     match todos.insert(task).await {
///         Ok(id) => Some(AddTodoAction::Saved { id }),
///         Err(error) => Some(AddTodoAction::SaveFailed { error: error.to_string() }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use tasklist_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(4),
///     action: TodoListAction::UndoWindowExpired
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}

/// Create an `Effect::Stream` from any `Stream` of actions
///
/// # Example
///
/// ```rust,ignore
/// use tasklist_core::stream_effect;
///
/// stream_effect!(todos.query(query).map(move |result| match result {
///     Ok(todos) => TodoListAction::TodosLoaded { generation, todos },
///     Err(error) => TodoListAction::QueryFailed { generation, error: error.to_string() },
/// }))
/// ```
#[macro_export]
macro_rules! stream_effect {
    ($stream:expr) => {
        $crate::effect::Effect::Stream(::std::boxed::Box::pin($stream))
    };
}

#[cfg(test)]
mod tests {
    use crate::effect::Effect;
    use std::time::Duration;

    #[derive(Clone, Debug)]
    #[allow(dead_code)]
    enum TestAction {
        AsyncResult { value: i32 },
        TimeoutExpired,
    }

    #[test]
    fn test_async_effect_macro() {
        let effect = async_effect! {
            Some(TestAction::AsyncResult { value: 42 })
        };

        assert!(matches!(effect, Effect::Future(_)));
    }

    #[test]
    fn test_delay_macro() {
        let effect = delay! {
            duration: Duration::from_secs(4),
            action: TestAction::TimeoutExpired
        };

        assert!(matches!(effect, Effect::Delay { .. }));
    }

    #[test]
    fn test_stream_effect_macro() {
        let effect = stream_effect!(futures::stream::iter(vec![
            TestAction::AsyncResult { value: 1 },
            TestAction::AsyncResult { value: 2 },
        ]));

        assert!(matches!(effect, Effect::Stream(_)));
    }
}
