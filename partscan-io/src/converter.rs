//! 外部矢量转换程序（默认 inkscape）：把 `.ai` 转为同目录下的纯 SVG。

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::IoError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub trait VectorConverter {
    /// 转换 `input`，返回生成的 SVG 路径。输出缺失或为空视为失败。
    fn convert(&self, input: &Path) -> Result<PathBuf, IoError>;
}

#[derive(Debug, Clone)]
pub struct InkscapeConverter {
    program: String,
    timeout: Duration,
}

impl InkscapeConverter {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// 输出文件：与输入同名、扩展名改为 `.svg`。
    pub fn output_path(input: &Path) -> PathBuf {
        input.with_extension("svg")
    }
}

impl Default for InkscapeConverter {
    fn default() -> Self {
        Self::new("inkscape", Duration::from_secs(120))
    }
}

impl VectorConverter for InkscapeConverter {
    fn convert(&self, input: &Path) -> Result<PathBuf, IoError> {
        let output = Self::output_path(input);
        info!(program = %self.program, input = %input.display(), "调用外部转换程序");

        let mut child = Command::new(&self.program)
            .arg(input)
            .arg("--export-plain-svg")
            .arg("--export-filename")
            .arg(&output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| IoError::ConverterSpawn {
                program: self.program.clone(),
                source,
            })?;

        // 在独立线程中读取 stderr，避免管道写满导致子进程阻塞
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                buf
            })
        });
        let collect_stderr = |reader: Option<thread::JoinHandle<String>>| {
            reader
                .and_then(|handle| handle.join().ok())
                .unwrap_or_default()
        };

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() > self.timeout {
                        warn!(program = %self.program, timeout = ?self.timeout, "转换超时，终止子进程");
                        let _ = child.kill();
                        let _ = child.wait();
                        let _ = collect_stderr(stderr_reader);
                        return Err(IoError::ConverterTimeout {
                            program: self.program.clone(),
                            timeout: self.timeout,
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(source) => {
                    let _ = child.kill();
                    return Err(IoError::ConverterSpawn {
                        program: self.program.clone(),
                        source,
                    });
                }
            }
        };

        let stderr = collect_stderr(stderr_reader);
        if !status.success() {
            return Err(IoError::ConverterFailed {
                program: self.program.clone(),
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        let produced = std::fs::metadata(&output)
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false);
        if !produced {
            return Err(IoError::ConverterOutputMissing { path: output });
        }
        debug!(output = %output.display(), elapsed = ?start.elapsed(), "转换完成");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_sibling_svg() {
        assert_eq!(
            InkscapeConverter::output_path(Path::new("/tmp/jobs/part.AI")),
            PathBuf::from("/tmp/jobs/part.svg")
        );
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let converter =
            InkscapeConverter::new("partscan-no-such-converter", Duration::from_secs(1));
        let err = converter.convert(Path::new("input.ai")).unwrap_err();
        assert!(matches!(err, IoError::ConverterSpawn { .. }));
    }
}
