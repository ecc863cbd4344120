// EsoxSolutions.ResourcePool
// Thread-safe pool of reusable resources with lifecycle policies and diagnostics
// Version 1.0.0

use esox_resourcepool::{
    format_leak_report, FnPolicy, HealthThresholds, Pool, PoolConfiguration, TokioScheduler,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
struct Connection {
    id: usize,
    queries: usize,
}

#[tokio::main]
async fn main() {
    println!("=== EsoxSolutions.ResourcePool v1.0.0 ===\n");

    let next_id = std::sync::atomic::AtomicUsize::new(1);
    let policy = FnPolicy::new(move || Connection {
        id: next_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed),
        queries: 0,
    })
    .with_reset(|conn: &mut Connection| conn.queries = 0);

    let config = PoolConfiguration::with_capacities(2, 4, 0)
        .with_prewarm()
        .with_origin_capture();
    let pool = match Pool::with_configuration(policy, config) {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("Failed to configure pool: {}", err);
            return;
        }
    };

    let Some(scheduler) = TokioScheduler::try_current() else {
        eprintln!("No tokio runtime available");
        return;
    };
    let pool = pool.with_scheduler(Arc::new(scheduler));

    println!("1. Acquire and release:");
    println!("   Pre-warmed: {} available", pool.available_count());
    if let Ok(mut conn) = pool.acquire() {
        conn.queries += 3;
        println!("   Using connection {} ({} queries)", conn.id, conn.queries);
        let kept = pool.release(conn).unwrap_or(false);
        println!("   Returned to pool: {}", kept);
    }

    println!("\n2. Guard released on drop:");
    {
        if let Ok(conn) = pool.acquire_guard() {
            println!("   Guarded connection {} ({} queries after reset)", conn.id, conn.queries);
        }
    }
    println!("   Active after drop: {}", pool.active_count());

    println!("\n3. Timed lease:");
    if let Ok(lease) = pool.acquire_timed(Duration::from_millis(50)) {
        let id = lease.with(|conn| conn.id);
        println!("   Leased connection {:?} for 50ms", id);
        tokio::time::sleep(Duration::from_millis(100)).await;
        println!("   Returned automatically: {}", lease.is_returned());
    }

    println!("\n4. Leak detection:");
    let held = pool.acquire();
    tokio::time::sleep(Duration::from_millis(20)).await;
    println!("   {}", format_leak_report(&pool.potential_leaks(Duration::from_millis(10))));
    if let Ok(conn) = held {
        let _ = pool.release(conn);
    }

    println!("\n5. Statistics:");
    println!("{}", pool.snapshot());

    println!("\n6. Health:");
    println!("   {}", pool.health_check(&HealthThresholds::default()));

    if let Err(err) = pool.dispose() {
        eprintln!("Dispose failed: {}", err);
    }
    println!("\nPool state: {}", pool.state());
}
