//! Shared fixtures for source tests

use std::fs::File;
use std::io::Write;
use std::path::Path;

use zip::write::SimpleFileOptions;

/// Two exception blocks and two plain lines
pub const CATALINA_LOG: &str = "\
10-Jun-2025 08:26:40.100 INFO [main] org.apache.catalina.startup.Catalina.start Server startup in [1520] milliseconds
10-Jun-2025 08:26:46.310 ERROR [http-nio-8080-exec-1] com.example.web.Dispatcher Request failed; nested exception is java.lang.NullPointerException: order id was null
\tat com.example.web.OrderController.place(OrderController.java:42)
10-Jun-2025 08:27:01.500 ERROR [http-nio-8080-exec-3] org.apache.catalina.core.StandardWrapperValve.invoke Servlet.service() threw exception with root cause
\tjava.sql.SQLTimeoutException: query timed out
\tat com.example.repo.OrderRepository.find(OrderRepository.java:115)
10-Jun-2025 08:27:02.000 WARN [scheduler-1] com.example.jobs.Cleanup Session store is slow
";

/// Write a stored (uncompressed) zip archive with the given members
pub fn write_zip(path: &Path, members: &[(&str, &str)]) {
    let file = File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, text) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(text.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}
