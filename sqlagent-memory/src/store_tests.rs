#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use sqlagent_core::{Message, Role};

    use crate::{ChatMessageHistory, InMemoryHistoryStore};

    #[tokio::test]
    async fn history_is_append_only_and_ordered() {
        let store = InMemoryHistoryStore::new();
        let session = "default";

        assert!(store.get(session).await.unwrap().is_empty());

        store
            .append_many(
                session,
                vec![Message::user("Hello"), Message::assistant("Hi there")],
            )
            .await
            .unwrap();
        store
            .append(session, Message::user("How are you?"))
            .await
            .unwrap();
        store
            .append(session, Message::assistant("I'm good"))
            .await
            .unwrap();

        let messages = store.get(session).await.unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "Hello");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[2].content, "How are you?");
        assert_eq!(messages[3].content, "I'm good");
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = InMemoryHistoryStore::new();
        store.append("a", Message::user("one")).await.unwrap();
        store.append("b", Message::user("two")).await.unwrap();
        store.clear("a").await.unwrap();

        assert!(store.get("a").await.unwrap().is_empty());
        assert_eq!(store.get("b").await.unwrap(), vec![Message::user("two")]);
        assert_eq!(store.sessions().await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn evict_removes_session() {
        let store = InMemoryHistoryStore::new();
        store.append("a", Message::user("one")).await.unwrap();

        assert!(store.evict("a").await);
        assert!(!store.evict("a").await);
        assert_eq!(store.len("a").await, 0);
        assert!(store.sessions().await.is_empty());
    }

    #[tokio::test]
    async fn evict_keeps_session_with_turn_in_flight() {
        let store = InMemoryHistoryStore::new();
        store.append("s", Message::user("kept")).await.unwrap();
        let guard = store.begin_turn("s").await.unwrap();

        assert!(!store.evict("s").await);
        assert_eq!(store.len("s").await, 1);

        // The held turn still excludes a second one for the same session.
        let second = tokio::time::timeout(Duration::from_millis(50), store.begin_turn("s")).await;
        assert!(second.is_err());

        drop(guard);
        assert!(store.evict("s").await);
        assert!(store.sessions().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn evict_idle_skips_active_and_in_flight_sessions() {
        let store = InMemoryHistoryStore::new().with_max_idle(Duration::from_secs(60));
        store.append("stale", Message::user("old")).await.unwrap();
        store.append("busy", Message::user("old")).await.unwrap();
        let guard = store.begin_turn("busy").await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        store.append("fresh", Message::user("new")).await.unwrap();

        assert_eq!(store.evict_idle().await, 1);
        assert_eq!(store.sessions().await, vec!["busy", "fresh"]);
        drop(guard);
    }

    #[tokio::test]
    async fn evict_idle_without_limit_is_noop() {
        let store = InMemoryHistoryStore::new();
        store.append("a", Message::user("one")).await.unwrap();
        assert_eq!(store.evict_idle().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn one_turn_per_session_at_a_time() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let first = store.begin_turn("s").await.unwrap();
        assert_eq!(first.session_id(), "s");

        let contender = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let _guard = store.begin_turn("s").await.unwrap();
                store.append("s", Message::user("second")).await.unwrap();
            })
        };

        // A different session is not blocked.
        let other = store.begin_turn("other").await.unwrap();
        drop(other);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());
        store.append("s", Message::user("first")).await.unwrap();
        drop(first);

        contender.await.unwrap();
        let contents: Vec<_> = store
            .get("s")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["first", "second"]);
    }
}
