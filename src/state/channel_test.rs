use std::sync::{Arc, Mutex};

use super::*;

fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |value: &T| sink.lock().unwrap().push(value.clone()))
}

// =============================================================
// Replay and publish
// =============================================================

#[test]
fn subscribe_replays_current_value() {
    let channel = Channel::new(false);
    channel.publish(true);

    let (seen, listener) = recorder::<bool>();
    channel.subscribe(listener);
    assert_eq!(*seen.lock().unwrap(), vec![true]);
}

#[test]
fn publish_notifies_even_when_unchanged() {
    let channel = Channel::new(0_u32);
    let (seen, listener) = recorder::<u32>();
    channel.subscribe(listener);
    channel.publish(0);
    channel.publish(0);
    assert_eq!(*seen.lock().unwrap(), vec![0, 0, 0]);
}

#[test]
fn listeners_run_in_subscription_order() {
    let channel = Channel::new(0_u32);
    let order = Arc::new(Mutex::new(Vec::new()));
    for tag in ["a", "b", "c"] {
        let order = Arc::clone(&order);
        channel.subscribe(move |value: &u32| {
            if *value > 0 {
                order.lock().unwrap().push(tag);
            }
        });
    }
    channel.publish(1);
    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
}

#[test]
fn unsubscribe_stops_delivery() {
    let channel = Channel::new(0_u32);
    let (seen, listener) = recorder::<u32>();
    let id = channel.subscribe(listener);
    assert_eq!(channel.subscriber_count(), 1);

    assert!(channel.unsubscribe(id));
    assert!(!channel.unsubscribe(id));
    channel.publish(5);
    assert_eq!(*seen.lock().unwrap(), vec![0]);
    assert_eq!(channel.get(), 5);
}

#[test]
fn listener_can_publish_to_other_channel() {
    let source = Channel::new(1_u32);
    let mirror = Channel::new(0_u32);
    let target = mirror.clone();
    source.subscribe(move |value: &u32| target.publish(value * 10));
    source.publish(4);
    assert_eq!(mirror.get(), 40);
}

// =============================================================
// wait_for
// =============================================================

#[tokio::test]
async fn wait_for_resolves_immediately_when_current_matches() {
    let channel = Channel::new(true);
    assert!(channel.wait_for(|ready| *ready).await);
    assert_eq!(channel.subscriber_count(), 0);
}

#[tokio::test]
async fn wait_for_resolves_on_later_publish() {
    let channel = Channel::new(false);
    let publisher = channel.clone();
    let task = tokio::spawn(async move {
        tokio::task::yield_now().await;
        publisher.publish(true);
    });
    assert!(channel.wait_for(|ready| *ready).await);
    task.await.unwrap();
    assert_eq!(channel.subscriber_count(), 0);
}

#[tokio::test]
async fn dropped_wait_for_removes_listener() {
    let channel = Channel::new(false);
    let waiting = channel.wait_for(|ready| *ready);
    let timed_out = tokio::time::timeout(std::time::Duration::from_millis(10), waiting).await;
    assert!(timed_out.is_err());
    assert_eq!(channel.subscriber_count(), 0);
}
