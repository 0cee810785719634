pub fn format_latency(ms: f64) -> String {
    if !ms.is_finite() || ms <= 0.0 {
        return "0ms".to_owned();
    }

    if ms >= 1000.0 {
        let seconds = ms / 1000.0;
        if (seconds - seconds.round()).abs() < 1e-9 {
            format!("{seconds:.0}s")
        } else {
            format!("{seconds:.2}s")
        }
    } else if ms >= 10.0 || (ms - ms.round()).abs() < 1e-9 {
        format!("{ms:.0}ms")
    } else {
        format!("{ms:.1}ms")
    }
}

pub fn format_rps(rps: f64) -> String {
    if rps >= 1000.0 {
        format!("{:.1}k rps", rps / 1000.0)
    } else if rps >= 10.0 {
        format!("{rps:.0} rps")
    } else {
        format!("{rps:.2} rps")
    }
}

pub fn format_count(count: f64) -> String {
    const UNITS: [&str; 4] = ["", "k", "M", "G"];

    let mut value = count.max(0.0);
    let mut unit = 0usize;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}{}", UNITS[unit])
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{value:.1}%")
}
