mod common;

use common::{MockApi, UNKNOWN_PACK};
use packdesk::views::customer::{CustomerDashboard, SyncTimings};
use packdesk::views::{Notice, NoticeKind};
use std::time::Duration;

fn fast() -> SyncTimings {
    SyncTimings {
        poll_interval: Duration::from_millis(50),
        flash: Duration::from_millis(100),
    }
}

fn slow() -> SyncTimings {
    SyncTimings {
        poll_interval: Duration::from_secs(3600),
        flash: Duration::from_secs(3600),
    }
}

#[tokio::test]
async fn test_mount_loads_everything() {
    let mock = MockApi::start().await;
    let dashboard = CustomerDashboard::mount(mock.customer(), slow()).await;

    let data = dashboard.data();
    assert_eq!(data.profile.map(|p| p.name), Some("Jane Doe".to_string()));
    assert_eq!(data.current.map(|s| s.pack_display()), Some("Pro".to_string()));
    assert_eq!(data.history.len(), 2);
    assert_eq!(data.packs.len(), 3);
    assert_eq!(dashboard.pack_options()[2].name, "Team");
}

#[tokio::test]
async fn test_failed_current_fetch_does_not_block_others() {
    let mock = MockApi::start().await;
    mock.state.set_fail_current(true);

    let dashboard = CustomerDashboard::mount(mock.customer(), slow()).await;

    let data = dashboard.data();
    assert!(data.current.is_none());
    assert!(data.profile.is_some());
    assert_eq!(data.history.len(), 2);
    assert_eq!(data.packs.len(), 3);
    assert_eq!(dashboard.notice(), None);
}

#[tokio::test]
async fn test_poller_refetches_until_teardown() {
    let mock = MockApi::start().await;
    let dashboard = CustomerDashboard::mount(mock.customer(), fast()).await;
    assert_eq!(mock.state.hits("history"), 1);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let polled = mock.state.hits("history");
    assert!(polled >= 3, "expected several polls, saw {polled}");
    // The poller never touches profile or packs
    assert_eq!(mock.state.hits("profile"), 1);
    assert_eq!(mock.state.hits("packs"), 1);

    dashboard.teardown();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let after_teardown = mock.state.hits("history");
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(mock.state.hits("history"), after_teardown);
}

#[tokio::test]
async fn test_poll_picks_up_server_changes() {
    let mock = MockApi::start().await;
    let dashboard = CustomerDashboard::mount(mock.customer(), fast()).await;

    mock.state.data.lock().unwrap().current = None;
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(dashboard.data().current.is_none());
}

#[tokio::test]
async fn test_refresh_flashes_then_clears() {
    let mock = MockApi::start().await;
    let dashboard = CustomerDashboard::mount(mock.customer(), fast()).await;

    dashboard.refresh().await;
    assert_eq!(dashboard.notice(), Some(Notice::success("Data refreshed!")));
    assert_eq!(mock.state.hits("profile"), 2);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(dashboard.notice(), None);
}

#[tokio::test]
async fn test_request_subscription_refetches_history() {
    let mock = MockApi::start().await;
    let mut dashboard = CustomerDashboard::mount(mock.customer(), slow()).await;

    dashboard.select_pack(2);
    assert_eq!(dashboard.pack_id, "3");

    dashboard.request_subscription().await;
    assert_eq!(dashboard.notice(), Some(Notice::success("Subscription request sent.")));
    assert_eq!(mock.state.hits("request"), 1);
    assert_eq!(dashboard.data().history.len(), 3);
}

#[tokio::test]
async fn test_request_failure_and_blank_id() {
    let mock = MockApi::start().await;
    let mut dashboard = CustomerDashboard::mount(mock.customer(), slow()).await;

    dashboard.pack_id = "   ".to_string();
    dashboard.request_subscription().await;
    assert_eq!(mock.state.hits("request"), 0);

    dashboard.toggle_manual_entry();
    dashboard.pack_id = UNKNOWN_PACK.to_string();
    dashboard.request_subscription().await;
    let notice = dashboard.notice().unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert_eq!(notice.text, "Pack not found");
    assert_eq!(dashboard.data().history.len(), 2);
}

#[tokio::test]
async fn test_pack_list_falls_back_to_history_ids() {
    let mock = MockApi::start().await;
    mock.state.data.lock().unwrap().packs.clear();

    let dashboard = CustomerDashboard::mount(mock.customer(), slow()).await;
    let names: Vec<String> = dashboard.pack_options().into_iter().map(|o| o.name).collect();
    assert_eq!(names, vec!["Pack 2".to_string(), "Pack 1".to_string()]);
}

#[tokio::test]
async fn test_second_request_while_in_flight_is_ignored() {
    let mock = MockApi::start().await;
    let mut dashboard = CustomerDashboard::mount(mock.customer(), slow()).await;
    dashboard.select_pack(0);

    let first = dashboard.request_task().unwrap();
    assert!(dashboard.is_requesting());
    assert!(dashboard.request_task().is_none());

    first.await;
    assert!(!dashboard.is_requesting());
    assert_eq!(mock.state.hits("request"), 1);
}

#[tokio::test]
async fn test_launch_loads_in_background() {
    let mock = MockApi::start().await;
    let dashboard = CustomerDashboard::launch(mock.customer(), slow());

    for _ in 0..100 {
        let data = dashboard.data();
        if data.profile.is_some() && data.packs.len() == 3 && data.history.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let data = dashboard.data();
    assert!(data.profile.is_some());
    assert_eq!(data.packs.len(), 3);
    assert_eq!(mock.state.hits("profile"), 1);
}
