//! Demonstration of demand-bridge-stream features.
//!
//! Run with: `RUST_LOG=demand_bridge=debug cargo run -p demand-bridge-stream --bin demo`

use demand_bridge::{AnyCancellable, BridgeSource, Completion, Emitter};
use demand_bridge_stream::{from_stream, EmitterSink, IntoStream, StreamConfig, StreamExt};
use futures_sink::Sink;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== demand-bridge-stream Demo ===\n");

    demo_callback_producer().await?;
    demo_slow_consumer().await?;
    demo_failure().await?;
    demo_sink_trait().await?;
    demo_from_stream().await?;
    demo_cancellation().await?;

    println!("\n=== All demos completed successfully! ===");
    Ok(())
}

/// Demo 1: A thread-based callback producer consumed as a stream
async fn demo_callback_producer() -> anyhow::Result<()> {
    println!("--- Demo 1: Callback Producer ---");

    let source = BridgeSource::<u64, String>::new(|emitter: Emitter<u64, String>| {
        thread::spawn(move || {
            for i in 0..5 {
                emitter.send(i);
            }
            emitter.finish();
        });
        AnyCancellable::empty()
    })
    .labeled("ticker");

    let mut stream = source.into_stream();
    while let Some(item) = stream.next().await {
        println!("  Received: {}", item.map_err(anyhow::Error::msg)?);
    }

    println!("  ✓ Callback producer complete\n");
    Ok(())
}

/// Demo 2: A fast producer and a one-at-a-time consumer
async fn demo_slow_consumer() -> anyhow::Result<()> {
    println!("--- Demo 2: Slow Consumer ---");

    let source = BridgeSource::<u32, String>::new(|emitter: Emitter<u32, String>| {
        // Everything is pushed up front; the bridge buffers it.
        for i in 0..10 {
            emitter.send(i);
        }
        emitter.finish();
        AnyCancellable::empty()
    });

    let mut stream = source.into_stream_with_config(StreamConfig::one_by_one());
    let mut count = 0;
    while let Some(item) = stream.next().await {
        item.map_err(anyhow::Error::msg)?;
        count += 1;
        println!("  Consumed {count}, outstanding credit {}", stream.outstanding());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    println!("  ✓ Slow consumer received {count} items\n");
    Ok(())
}

/// Demo 3: Failure is delivered after every buffered value
async fn demo_failure() -> anyhow::Result<()> {
    println!("--- Demo 3: Failure ---");

    let source = BridgeSource::<&'static str, String>::new(|emitter: Emitter<&'static str, String>| {
        emitter.send("reading-1");
        emitter.send("reading-2");
        emitter.send_completion(Completion::Failed("sensor offline".to_string()));
        AnyCancellable::empty()
    });

    let items: Vec<_> = source.into_stream().collect().await;
    for item in &items {
        println!("  {item:?}");
    }

    println!("  ✓ Failure handling complete\n");
    Ok(())
}

/// Demo 4: Producing through the Sink trait
async fn demo_sink_trait() -> anyhow::Result<()> {
    println!("--- Demo 4: Sink Trait ---");

    let source = BridgeSource::<i32, String>::new(|emitter: Emitter<i32, String>| {
        let mut sink = EmitterSink::new(emitter);

        // Direct Sink usage via poll functions
        let waker = futures_util::task::noop_waker();
        let mut cx = std::task::Context::from_waker(&waker);
        let mut pinned = Pin::new(&mut sink);
        for v in [1, 2, 3] {
            if pinned.as_mut().poll_ready(&mut cx).is_ready() {
                let _ = pinned.as_mut().start_send(v);
            }
        }
        let _ = pinned.as_mut().poll_close(&mut cx);
        AnyCancellable::empty()
    });

    let items: Vec<_> = source.into_stream().collect().await;
    println!("  Received via sink: {items:?}");
    println!("  ✓ Sink trait complete\n");
    Ok(())
}

/// Demo 5: An async stream as a source
async fn demo_from_stream() -> anyhow::Result<()> {
    println!("--- Demo 5: From Stream ---");

    let source = from_stream(|| {
        tokio_stream::iter((1..=3).map(|i| Ok::<_, String>(format!("line {i}"))))
    });

    let mut stream = source.into_stream();
    while let Some(line) = stream.next().await {
        println!("  {}", line.map_err(anyhow::Error::msg)?);
    }

    println!("  ✓ From stream complete\n");
    Ok(())
}

/// Demo 6: Dropping the stream cancels the producer
async fn demo_cancellation() -> anyhow::Result<()> {
    println!("--- Demo 6: Cancellation ---");

    let stopped = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stopped);
    let source = BridgeSource::<u64, String>::new(move |emitter: Emitter<u64, String>| {
        let running = Arc::new(AtomicBool::new(true));
        let worker_running = Arc::clone(&running);
        thread::spawn(move || {
            let mut i = 0;
            while worker_running.load(Ordering::SeqCst) && !emitter.is_detached() {
                emitter.send(i);
                i += 1;
                thread::sleep(Duration::from_millis(1));
            }
        });

        let flag = Arc::clone(&flag);
        AnyCancellable::new(move || {
            running.store(false, Ordering::SeqCst);
            flag.store(true, Ordering::SeqCst);
        })
    });

    let taken: Vec<_> = source.into_stream().take(3).collect().await;
    println!("  Took {} items before dropping the stream", taken.len());
    println!("  Producer stopped: {}", stopped.load(Ordering::SeqCst));
    println!("  ✓ Cancellation complete\n");
    Ok(())
}
