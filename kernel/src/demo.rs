//! Processes started at boot. They talk to the kernel only through
//! `user_lib`, so each one exercises the svc path.

use kestrel_kernel::{mm, syscall, task, timer, KernelResult};
use user_lib::{exit, getpid, println, read, yield_};

const ROUNDS: usize = 5;

pub fn spawn() -> KernelResult<()> {
    task::process_create(ping, "ping")?;
    task::process_create(pong, "pong")?;
    task::process_create(spinner, "spinner")?;
    task::process_create(monitor, "monitor")?;
    Ok(())
}

fn volley(label: &str) -> ! {
    let pid = getpid();
    for round in 0..ROUNDS {
        println!("[{} {}] round {}", label, pid, round);
        yield_();
    }
    exit(0)
}

extern "C" fn ping() -> ! {
    volley("ping")
}

extern "C" fn pong() -> ! {
    volley("pong")
}

/// Never yields; only the timer gets it off the CPU.
extern "C" fn spinner() -> ! {
    let pid = getpid();
    let mut reported = 0;
    let mut spins: u64 = 0;
    while reported < 3 {
        spins = spins.wrapping_add(1);
        let now = timer::uptime_ms();
        if now / 500 > reported {
            reported = now / 500;
            println!("[spinner {}] {} spins by {} ms", pid, spins, now);
        }
    }
    exit(0)
}

extern "C" fn monitor() -> ! {
    let mut buf = [0u8; 8];
    let got = read(user_lib::STDIN, &mut buf);
    println!("[monitor {}] read returned {}", getpid(), got);

    while task::process_list().iter().any(|p| p.name == "spinner") {
        yield_();
    }

    let sched = task::scheduler_get_stats();
    let calls = syscall::syscall_stats();
    println!(
        "[monitor] switches {}, runnable {}, syscalls {}, uptime {} ms",
        sched.context_switches,
        sched.running_processes,
        calls.total,
        timer::uptime_ms()
    );
    let heap = mm::heap_stats();
    println!("[monitor] heap {} / {} bytes in use", heap.allocated, heap.total);
    for info in task::process_list() {
        println!(
            "[monitor]   pid {} {:<8} {:?} ticks {}",
            info.pid, info.name, info.state, info.total_time
        );
    }
    exit(0)
}
