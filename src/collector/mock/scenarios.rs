//! Pre-built mock host scenarios for testing.
//!
//! These scenarios provide realistic `/proc` contents and `free` output for
//! exercising the sampler end to end.

use super::filesystem::MockFs;

impl MockFs {
    /// Creates a typical host: four disks, two interfaces, 40% memory used.
    pub fn typical_host() -> Self {
        let mut fs = Self::new();

        fs.add_file(
            "/proc/stat",
            "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
cpu1 2500 125 750 20000 250 50 25 0 0 0
cpu2 2500 125 750 20000 250 50 25 0 0 0
cpu3 2500 125 750 20000 250 50 25 0 0 0
intr 1000000 50 0 0 0 0 0 0 0 1 0 0 0 100 0 0 1000
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 0
",
        );

        // Disk statistics
        fs.add_file(
            "/proc/diskstats",
            "\
   8       0 sda 12345 100 987654 5000 6789 50 456789 3000 0 4000 8000 0 0 0 0
   8       1 sda1 10000 80 800000 4000 5000 40 400000 2500 0 3500 6500 0 0 0 0
 259       0 nvme0n1 50000 200 2000000 10000 30000 150 1500000 8000 5 15000 18000 0 0 0 0
   7       0 loop0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
",
        );

        // Network device statistics
        fs.add_file(
            "/proc/net/dev",
            "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 104857600 1234    0    0    0     0          0         0 104857600 1234    0    0    0     0       0          0
  eth0: 524288000 5678    1    2    0     0          0        10 262144000 4321    3    4    0     0       0          0
",
        );

        fs.add_command_output(
            "free",
            "SwapUse           0 CachUse        1000  MemUse        4000 MemFree        5000\n",
        );

        fs
    }

    /// Replaces the aggregate CPU line of `/proc/stat`.
    pub fn set_cpu_ticks(&mut self, values: [u64; 10]) {
        let fields: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        self.add_file("/proc/stat", format!("cpu  {}\n", fields.join(" ")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::traits::FileSystem;
    use std::path::Path;

    #[test]
    fn set_cpu_ticks_writes_aggregate_line() {
        let mut fs = MockFs::typical_host();
        fs.set_cpu_ticks([1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let content = fs.read_to_string(Path::new("/proc/stat")).unwrap();
        assert_eq!(content, "cpu  1 2 3 4 5 6 7 8 9 10\n");
    }
}
