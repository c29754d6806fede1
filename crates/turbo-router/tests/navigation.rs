//! End-to-end navigation tests against an in-memory history.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::Notify;
use turbo_router::{
    match_routes, parse_param, CachePolicy, Loader, LoaderContext, Location, ManualClock, MatchId,
    MatchOptions, MatchRouteOptions, MatchSnapshot, MatchStatus, MemoryHistory, NavigateOptions,
    Route, RouteTree, Router, RouterError, RouterSnapshot, RouterStatus, RouterStore, SearchMap,
    SharedValue,
};

fn counting(counter: &Arc<AtomicUsize>, value: Value) -> impl Loader {
    let counter = Arc::clone(counter);
    move |_ctx: LoaderContext| {
        counter.fetch_add(1, Ordering::SeqCst);
        let value = value.clone();
        async move { Ok::<_, anyhow::Error>(value) }
    }
}

fn router(root: Route, clock: &ManualClock) -> Router {
    Router::builder(RouteTree::build(root).unwrap())
        .with_clock(clock.clone())
        .build()
}

fn route_ids(snapshot: &RouterSnapshot) -> Vec<String> {
    snapshot
        .current_matches
        .iter()
        .map(|m| m.route_id.clone())
        .collect()
}

async fn run_pending_tasks() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_chain_is_root_to_leaf_or_not_found() {
    let clock = ManualClock::new(0);
    let router = router(
        Route::root().children(vec![
            Route::new("/"),
            Route::new("posts").children(vec![
                Route::new("/"),
                Route::new("$postId").children(vec![Route::new("comments")]),
            ]),
        ]),
        &clock,
    );

    for href in ["/", "/posts", "/posts/3", "/posts/3/comments"] {
        let outcome = router.navigate(Location::parse(href)).await.unwrap();
        let ids: Vec<&str> = outcome.matches.iter().map(|m| m.route_id()).collect();

        assert_eq!(ids[0], "__root__", "{href}");
        for pair in ids.windows(2) {
            assert!(router.tree().is_child_of(pair[1], pair[0]), "{href}: {pair:?}");
        }
    }

    let err = router
        .navigate(Location::parse("/posts/3/likes"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let snapshot = router.snapshot();
    assert!(snapshot.current_matches.is_empty());
    assert!(snapshot.error.as_ref().is_some_and(RouterError::is_not_found));
    assert_eq!(router.location().pathname, "/posts/3/likes");
}

#[tokio::test]
async fn test_dynamic_param_raw_and_typed() {
    let clock = ManualClock::new(0);
    let router = router(
        Route::root().children(vec![Route::new("posts").children(vec![
            Route::new("$id").parse_params(parse_param("id", |s| s.parse::<i64>())),
        ])]),
        &clock,
    );

    let descriptors = match_routes(
        router.tree(),
        "/posts/42",
        &SearchMap::new(),
        MatchOptions::default(),
    )
    .unwrap();
    let leaf = descriptors.last().unwrap();
    assert_eq!(leaf.raw_params.get("id").map(String::as_str), Some("42"));
    assert_eq!(leaf.params.get("id").and_then(SharedValue::as_i64), Some(42));

    router.navigate(Location::parse("/posts/42")).await.unwrap();
    let post = router.get_match("/posts/$id").unwrap();
    assert_eq!(post.match_id, MatchId::new("/posts/$id?id=42"));
    assert_eq!(post.params.get("id").and_then(SharedValue::as_i64), Some(42));
}

#[tokio::test]
async fn test_loader_runs_once_within_max_age() {
    let clock = ManualClock::new(1_000);
    let calls = Arc::new(AtomicUsize::new(0));
    let router = router(
        Route::root().children(vec![Route::new("posts").children(vec![Route::new("$postId")
            .cache(CachePolicy::new().with_max_age(Duration::from_secs(10)))
            .loader(counting(&calls, json!({"title": "x"})))])]),
        &clock,
    );

    router.navigate(Location::parse("/posts/1")).await.unwrap();
    router.navigate(Location::parse("/posts/1")).await.unwrap();
    clock.advance(Duration::from_secs(9));
    router.navigate(Location::parse("/posts/1")).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    clock.advance(Duration::from_secs(2));
    router.navigate(Location::parse("/posts/1")).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_load() {
    let clock = ManualClock::new(0);
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());

    let loader_calls = Arc::clone(&calls);
    let loader_gate = Arc::clone(&gate);
    let router = router(
        Route::root().children(vec![Route::new("posts").children(vec![Route::new("$postId")
            .loader(move |_ctx: LoaderContext| {
                loader_calls.fetch_add(1, Ordering::SeqCst);
                let gate = Arc::clone(&loader_gate);
                async move {
                    gate.notified().await;
                    Ok::<_, anyhow::Error>(json!({"title": "x"}))
                }
            })])]),
        &clock,
    );

    let opts = NavigateOptions::to("/posts/$postId").with_param("postId", "1");
    let first = router.preload(&opts).unwrap();
    let second = router.preload(&opts).unwrap();
    run_pending_tasks().await;

    let leaf = first.leaf().unwrap();
    assert!(Arc::ptr_eq(leaf, second.leaf().unwrap()));
    assert_eq!(leaf.status(), MatchStatus::Loading);

    gate.notify_one();
    let (a, b) = tokio::join!(first.settled(), second.settled());
    assert!(a.is_success() && b.is_success());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(leaf.status(), MatchStatus::Success);
}

#[tokio::test]
async fn test_preload_then_navigate_is_cache_hit() {
    let clock = ManualClock::new(0);
    let calls = Arc::new(AtomicUsize::new(0));
    let router = router(
        Route::root().children(vec![Route::new("about").loader(counting(&calls, json!("hello")))]),
        &clock,
    );

    let chain = router.preload(&NavigateOptions::to("/about")).unwrap();
    chain.settled().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(router.snapshot().current_matches.is_empty());

    let outcome = router.navigate(Location::parse("/about")).await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let about = router.get_match("/about").unwrap();
    assert!(about.is_preload);
    assert_eq!(about.loader_data, Some(SharedValue::from("hello")));

    // Preloaded data expires after the preload window
    clock.advance(Duration::from_millis(2_000));
    router.navigate(Location::parse("/about")).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

fn snapshot_with_data(data: Value) -> Arc<MatchSnapshot> {
    Arc::new(MatchSnapshot {
        match_id: MatchId::new("__root__"),
        route_id: "__root__".to_string(),
        status: MatchStatus::Success,
        params: SharedValue::empty_object(),
        search: SharedValue::empty_object(),
        loader_data: Some(SharedValue::from(data)),
        error: None,
        invalid_at: 0,
        updated_at: 0,
        is_preload: false,
    })
}

#[test]
fn test_store_shares_unchanged_subtrees() {
    let mut initial = RouterSnapshot::initial(Location::parse("/"));
    initial.current_matches = Arc::new(vec![snapshot_with_data(json!({"a": {"x": 1}, "b": {"y": 2}}))]);
    let store = RouterStore::new(initial);
    let before = store.snapshot();

    let mut next = (*before).clone();
    next.current_matches = Arc::new(vec![snapshot_with_data(json!({"a": {"x": 1}, "b": {"y": 3}}))]);
    assert!(store.publish(next));

    let after = store.snapshot();
    let old = before.current_matches[0].loader_data.clone().unwrap();
    let new = after.current_matches[0].loader_data.clone().unwrap();
    assert!(!new.same_ref(&old));
    assert!(new.get("a").unwrap().same_ref(old.get("a").unwrap()));
    assert_eq!(new.get("b").and_then(|b| b.get("y")).and_then(SharedValue::as_i64), Some(3));
    assert!(Arc::ptr_eq(&before.location, &after.location));
    assert_eq!(after.version, before.version + 1);

    let mut same = (*after).clone();
    same.current_matches = Arc::new(vec![snapshot_with_data(json!({"a": {"x": 1}, "b": {"y": 3}}))]);
    assert!(!store.publish(same));
    assert!(Arc::ptr_eq(&after, &store.snapshot()));
}

#[tokio::test]
async fn test_navigation_shares_unchanged_matches() {
    let clock = ManualClock::new(0);
    let calls = Arc::new(AtomicUsize::new(0));
    let router = router(
        Route::root().children(vec![Route::new("posts")
            .cache(CachePolicy::new().with_max_age(Duration::from_secs(60)))
            .loader(counting(&calls, json!({"count": 2})))
            .children(vec![Route::new("$postId").loader(
                |ctx: LoaderContext| async move {
                    Ok::<_, anyhow::Error>(json!({"id": ctx.param("postId").map(SharedValue::to_json)}))
                },
            )])]),
        &clock,
    );

    router.navigate(Location::parse("/posts/1")).await.unwrap();
    let first = router.snapshot();
    clock.advance(Duration::from_secs(1));
    router.navigate(Location::parse("/posts/2")).await.unwrap();
    let second = router.snapshot();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!Arc::ptr_eq(&first.current_matches, &second.current_matches));
    assert!(Arc::ptr_eq(&first.current_matches[0], &second.current_matches[0]));
    assert!(Arc::ptr_eq(&first.current_matches[1], &second.current_matches[1]));
    assert!(!Arc::ptr_eq(&first.current_matches[2], &second.current_matches[2]));
    assert!(second.version > first.version);
}

#[tokio::test]
async fn test_latest_navigation_wins() {
    let clock = ManualClock::new(0);
    let gate = Arc::new(Notify::new());
    let loader_gate = Arc::clone(&gate);

    let router = router(
        Route::root().children(vec![
            Route::new("a").loader(move |_ctx: LoaderContext| {
                let gate = Arc::clone(&loader_gate);
                async move {
                    gate.notified().await;
                    Ok::<_, anyhow::Error>(json!({"page": "a"}))
                }
            }),
            Route::new("b").loader(|_ctx: LoaderContext| async move {
                Ok::<_, anyhow::Error>(json!({"page": "b"}))
            }),
        ]),
        &clock,
    );

    let slow = tokio::spawn({
        let router = router.clone();
        async move { router.navigate(Location::parse("/a")).await }
    });
    run_pending_tasks().await;

    let loading = router.snapshot();
    assert_eq!(loading.status, RouterStatus::Loading);
    assert_eq!(loading.pending_location.as_ref().map(|l| l.pathname.as_str()), Some("/a"));
    assert!(loading.is_fetching);

    let fast = router.navigate(Location::parse("/b")).await.unwrap();
    assert!(fast.committed);
    assert_eq!(route_ids(&router.snapshot()), vec!["__root__", "/b"]);

    gate.notify_one();
    let slow = slow.await.unwrap().unwrap();
    assert!(!slow.committed);

    let snapshot = router.snapshot();
    assert_eq!(route_ids(&snapshot), vec!["__root__", "/b"]);
    assert_eq!(snapshot.status, RouterStatus::Idle);
    assert!(snapshot.pending_location.is_none());
    assert_eq!(router.location().pathname, "/b");

    let a = router.cached(&MatchId::new("/a")).unwrap();
    assert_eq!(a.status(), MatchStatus::Success);
    assert_eq!(a.loader_data(), Some(SharedValue::from(json!({"page": "a"}))));
}

#[tokio::test]
async fn test_dropped_navigation_commits_when_loaded() {
    let clock = ManualClock::new(0);
    let gate = Arc::new(Notify::new());
    let loader_gate = Arc::clone(&gate);
    let router = router(
        Route::root().children(vec![Route::new("a").loader(move |_ctx: LoaderContext| {
            let gate = Arc::clone(&loader_gate);
            async move {
                gate.notified().await;
                Ok::<_, anyhow::Error>(json!({"page": "a"}))
            }
        })]),
        &clock,
    );

    let timed_out =
        tokio::time::timeout(Duration::from_millis(10), router.navigate(Location::parse("/a"))).await;
    assert!(timed_out.is_err());
    assert_eq!(router.snapshot().status, RouterStatus::Loading);

    let mut rx = router.subscribe();
    gate.notify_one();
    tokio::time::timeout(
        Duration::from_secs(1),
        rx.wait_for(|snapshot| snapshot.status == RouterStatus::Idle),
    )
    .await
    .unwrap()
    .unwrap();

    let snapshot = router.snapshot();
    assert!(snapshot.pending_location.is_none());
    assert_eq!(route_ids(&snapshot), vec!["__root__", "/a"]);
    assert_eq!(router.location().pathname, "/a");
    assert_eq!(
        snapshot.leaf().and_then(|m| m.loader_data.clone()),
        Some(SharedValue::from(json!({"page": "a"})))
    );
}

#[tokio::test]
async fn test_literal_and_param_siblings_keep_separate_entries() {
    let clock = ManualClock::new(0);
    let router = router(
        Route::root().children(vec![
            Route::new("posts")
                .cache(CachePolicy::new().with_max_age(Duration::from_secs(60)))
                .loader(|_ctx: LoaderContext| async move {
                    Ok::<_, anyhow::Error>(json!("literal"))
                })
                .children(vec![Route::new("me")]),
            Route::new("$section")
                .loader(|_ctx: LoaderContext| async move {
                    Ok::<_, anyhow::Error>(json!("dynamic"))
                })
                .children(vec![Route::new("$item")]),
        ]),
        &clock,
    );

    router.navigate(Location::parse("/posts/me")).await.unwrap();
    let outcome = router.navigate(Location::parse("/posts/42")).await.unwrap();

    let ids: Vec<&str> = outcome.matches.iter().map(|m| m.route_id()).collect();
    assert_eq!(ids, vec!["__root__", "/$section", "/$section/$item"]);
    for pair in ids.windows(2) {
        assert!(router.tree().is_child_of(pair[1], pair[0]), "{pair:?}");
    }
    assert_eq!(
        outcome.matches[1].loader_data(),
        Some(SharedValue::from(json!("dynamic")))
    );
    assert_eq!(
        router.cached(&MatchId::new("/posts")).and_then(|m| m.loader_data()),
        Some(SharedValue::from(json!("literal")))
    );
}

fn blog(calls: &Arc<AtomicUsize>) -> Route {
    let calls = Arc::clone(calls);
    Route::root().children(vec![Route::new("posts").children(vec![Route::new("$postId")
        .parse_params(parse_param("postId", |s| s.parse::<i64>()))
        .loader(move |ctx: LoaderContext| {
            calls.fetch_add(1, Ordering::SeqCst);
            let id = ctx.param("postId").and_then(SharedValue::as_i64);
            async move { Ok::<_, anyhow::Error>(json!({"post": {"id": id, "title": "x"}})) }
        })])])
}

#[tokio::test]
async fn test_dehydrate_hydrate_round_trip() {
    let server_calls = Arc::new(AtomicUsize::new(0));
    let server = Router::builder(RouteTree::build(blog(&server_calls)).unwrap())
        .with_history(MemoryHistory::new("/posts/3"))
        .with_clock(ManualClock::new(5_000))
        .build();
    server.load().await.unwrap();
    let payload = server.dehydrate_json().unwrap();
    assert_eq!(server_calls.load(Ordering::SeqCst), 1);

    let client_calls = Arc::new(AtomicUsize::new(0));
    let client = Router::builder(RouteTree::build(blog(&client_calls)).unwrap())
        .with_history(MemoryHistory::new("/posts/3"))
        .with_clock(ManualClock::new(5_100))
        .build();
    let outcome = client.hydrate_json(&payload).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(client_calls.load(Ordering::SeqCst), 0);

    let leaf = client.snapshot().leaf().cloned().unwrap();
    assert_eq!(leaf.status, MatchStatus::Success);
    assert_eq!(
        leaf.loader_data,
        Some(SharedValue::from(json!({"post": {"id": 3, "title": "x"}})))
    );
    assert_eq!(leaf.loader_data, server.snapshot().leaf().and_then(|m| m.loader_data.clone()));
}

#[tokio::test]
async fn test_hydrated_null_data_is_not_reloaded() {
    fn tree(calls: &Arc<AtomicUsize>) -> RouteTree {
        RouteTree::build(
            Route::root().children(vec![Route::new("drafts").loader(counting(calls, Value::Null))]),
        )
        .unwrap()
    }

    let server_calls = Arc::new(AtomicUsize::new(0));
    let server = Router::builder(tree(&server_calls))
        .with_history(MemoryHistory::new("/drafts"))
        .with_clock(ManualClock::new(0))
        .build();
    server.load().await.unwrap();

    let client_calls = Arc::new(AtomicUsize::new(0));
    let client = Router::builder(tree(&client_calls))
        .with_history(MemoryHistory::new("/drafts"))
        .with_clock(ManualClock::new(0))
        .build();
    let outcome = client.hydrate_json(&server.dehydrate_json().unwrap()).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(server_calls.load(Ordering::SeqCst), 1);
    assert_eq!(client_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        client.get_match("/drafts").and_then(|m| m.loader_data.clone()),
        Some(SharedValue::Null)
    );
}

#[tokio::test]
async fn test_hydrating_another_location_loads_normally() {
    let server_calls = Arc::new(AtomicUsize::new(0));
    let server = Router::builder(RouteTree::build(blog(&server_calls)).unwrap())
        .with_history(MemoryHistory::new("/posts/3"))
        .with_clock(ManualClock::new(0))
        .build();
    server.load().await.unwrap();

    let client_calls = Arc::new(AtomicUsize::new(0));
    let client = Router::builder(RouteTree::build(blog(&client_calls)).unwrap())
        .with_history(MemoryHistory::new("/posts/4"))
        .with_clock(ManualClock::new(0))
        .build();
    client.hydrate(&server.dehydrate()).await.unwrap();

    assert_eq!(client_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        client.get_match("/posts/$postId").and_then(|m| m.loader_data.clone()),
        Some(SharedValue::from(json!({"post": {"id": 4, "title": "x"}})))
    );
}

#[tokio::test]
async fn test_child_search_validation_failure_keeps_parent() {
    let clock = ManualClock::new(0);
    let calls = Arc::new(AtomicUsize::new(0));
    let router = router(
        Route::root().children(vec![Route::new("posts")
            .cache(CachePolicy::new().with_max_age(Duration::from_secs(60)))
            .loader(counting(&calls, json!({"count": 2})))
            .children(vec![Route::new("$postId").validate_search(
                |search: &SearchMap| -> Result<SearchMap, String> {
                    match search.get("page").and_then(Value::as_i64) {
                        Some(_) => Ok(SearchMap::new()),
                        None => Err("page must be a number".to_string()),
                    }
                },
            )])]),
        &clock,
    );

    router.navigate(Location::parse("/posts")).await.unwrap();
    let err = router
        .navigate(Location::parse("/posts/1?page=first"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RouterError::SearchValidation { ref route_id, .. } if route_id == "/posts/$postId"
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        router.cached(&MatchId::new("/posts")).map(|m| m.status()),
        Some(MatchStatus::Success)
    );
    assert!(router.cached(&MatchId::new("/posts/$postId?postId=1")).is_none());
    assert!(matches!(
        router.snapshot().error,
        Some(RouterError::SearchValidation { .. })
    ));

    let ok = router
        .navigate(Location::parse("/posts/1?page=2"))
        .await
        .unwrap();
    assert!(ok.is_success());
    assert!(router.snapshot().error.is_none());
}

#[derive(Debug, thiserror::Error)]
#[error("post {0} is gone")]
struct Gone(i64);

#[tokio::test]
async fn test_loader_error_stops_descendants() {
    let clock = ManualClock::new(0);
    let comment_calls = Arc::new(AtomicUsize::new(0));
    let router = router(
        Route::root().children(vec![Route::new("posts").children(vec![Route::new("$postId")
            .loader(|_ctx: LoaderContext| async move {
                Err::<Value, _>(anyhow::Error::new(Gone(3)))
            })
            .children(vec![Route::new("comments").loader(counting(&comment_calls, json!([])))])])]),
        &clock,
    );

    let outcome = router
        .navigate(Location::parse("/posts/3/comments"))
        .await
        .unwrap();

    assert!(outcome.committed);
    let err = outcome.error.unwrap();
    assert_eq!(err.route_id(), Some("/posts/$postId"));
    assert_eq!(
        err.loader_error().and_then(|e| e.downcast_ref::<Gone>()).map(|g| g.0),
        Some(3)
    );
    assert_eq!(comment_calls.load(Ordering::SeqCst), 0);

    let snapshot = router.snapshot();
    let statuses: Vec<MatchStatus> = snapshot.current_matches.iter().map(|m| m.status).collect();
    assert_eq!(
        statuses,
        vec![
            MatchStatus::Success,
            MatchStatus::Success,
            MatchStatus::Error,
            MatchStatus::Idle
        ]
    );
    let post = router.get_match("/posts/$postId").unwrap();
    assert!(post.error.as_ref().is_some_and(|e| e.downcast_ref::<Gone>().is_some()));
}

#[tokio::test]
async fn test_navigate_to_records_history() {
    let clock = ManualClock::new(0);
    let router = router(
        Route::root().children(vec![
            Route::new("/"),
            Route::new("posts").children(vec![Route::new("$postId")]),
        ]),
        &clock,
    );
    router.load().await.unwrap();

    let post = |id: &str| NavigateOptions::to("/posts/$postId").with_param("postId", id);
    router.navigate_to(post("5")).await.unwrap();
    router
        .navigate_to(post("6").with_search_param("tab", "comments"))
        .await
        .unwrap();
    assert_eq!(router.location().href(), "/posts/6?tab=comments");

    router.back().await.unwrap().unwrap();
    assert_eq!(router.location().pathname, "/posts/5");

    router.navigate_to(post("7").with_replace(true)).await.unwrap();
    router.back().await.unwrap().unwrap();
    assert_eq!(router.location().pathname, "/");
    assert_eq!(route_ids(&router.snapshot()), vec!["__root__", "/"]);

    router.forward().await.unwrap().unwrap();
    assert_eq!(router.location().pathname, "/posts/7");
}

#[tokio::test]
async fn test_invalidate_and_reload() {
    let clock = ManualClock::new(0);
    let calls = Arc::new(AtomicUsize::new(0));
    let router = router(
        Route::root().children(vec![Route::new("inbox")
            .cache(CachePolicy::new().with_max_age(Duration::from_secs(60)))
            .loader(counting(&calls, json!({"unread": 1})))]),
        &clock,
    );

    router.navigate(Location::parse("/inbox")).await.unwrap();
    router.navigate(Location::parse("/inbox")).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert_eq!(router.invalidate_route("/inbox"), 1);
    router.navigate(Location::parse("/inbox")).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let key = router.location().key;
    router.reload().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_ne!(router.location().key, key);

    router.invalidate_all();
    router.navigate(Location::parse("/inbox")).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_match_route_against_current_location() {
    let clock = ManualClock::new(0);
    let router = router(
        Route::root().children(vec![Route::new("posts").children(vec![Route::new("$postId")])]),
        &clock,
    );
    router.navigate(Location::parse("/Posts/3")).await.unwrap();

    let params = router
        .match_route("/posts/$postId", MatchRouteOptions::default())
        .unwrap();
    assert_eq!(params.get("postId").map(String::as_str), Some("3"));

    assert!(router.match_route("/posts", MatchRouteOptions::default()).is_none());
    let fuzzy = MatchRouteOptions {
        fuzzy: true,
        ..Default::default()
    };
    assert!(router.match_route("/posts", fuzzy).is_some());

    let strict = MatchRouteOptions {
        case_sensitive: Some(true),
        ..Default::default()
    };
    assert!(router.match_route("/posts/$postId", strict).is_none());

    let pending = MatchRouteOptions {
        pending: true,
        ..Default::default()
    };
    assert!(router.match_route("/posts/$postId", pending).is_none());
}

#[tokio::test]
async fn test_subscribers_see_published_snapshots() {
    let clock = ManualClock::new(0);
    let router = router(
        Route::root().children(vec![Route::new("about").loader(counting(
            &Arc::new(AtomicUsize::new(0)),
            json!("hi"),
        ))]),
        &clock,
    );
    let mut rx = router.subscribe();

    router.navigate(Location::parse("/about")).await.unwrap();

    assert!(rx.has_changed().unwrap());
    let snapshot = rx.borrow_and_update().clone();
    assert!(snapshot.version > 0);
    assert_eq!(snapshot.status, RouterStatus::Idle);
    assert_eq!(route_ids(&snapshot), vec!["__root__", "/about"]);

    let entry = router.match_handle("/about").unwrap();
    let state = entry.subscribe();
    assert_eq!(state.borrow().status, MatchStatus::Success);
}
