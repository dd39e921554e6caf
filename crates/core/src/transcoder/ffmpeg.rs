//! FFmpeg-based transcoder implementation.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use super::config::TranscoderConfig;
use super::error::TranscodeError;
use super::traits::Transcoder;
use super::types::{parse_frame_rate, Acceleration, RepairJob, SegmentJob, TranscodeOutcome};

/// FFmpeg-based transcoder implementation.
pub struct FfmpegTranscoder {
    config: TranscoderConfig,
}

impl FfmpegTranscoder {
    /// Creates a new FFmpeg transcoder with the given configuration.
    pub fn new(config: TranscoderConfig) -> Self {
        Self { config }
    }

    /// Creates a transcoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TranscoderConfig::default())
    }

    /// Builds ffmpeg arguments for stream-copy segmenting.
    fn build_segment_args(&self, job: &SegmentJob) -> Vec<String> {
        let mut args = vec!["-y".to_string()];

        if job.acceleration == Acceleration::Hardware {
            args.extend(["-hwaccel".to_string(), "auto".to_string()]);
        }

        args.extend([
            "-err_detect".to_string(),
            "ignore_err".to_string(),
            "-i".to_string(),
            path_arg(&job.input_path),
            // Stream copy, no re-encode
            "-c:v".to_string(),
            "copy".to_string(),
            "-c:a".to_string(),
            "copy".to_string(),
            "-hls_time".to_string(),
            self.config.segment_secs.to_string(),
            "-hls_list_size".to_string(),
            "0".to_string(),
            "-hls_segment_filename".to_string(),
            path_arg(&job.output_dir.join(&job.segment_template)),
            "-hls_flags".to_string(),
            "discont_start+temp_file+independent_segments".to_string(),
            // Timestamp repair for damaged sources
            "-avoid_negative_ts".to_string(),
            "make_zero".to_string(),
            "-fflags".to_string(),
            "+genpts+igndts".to_string(),
            "-reset_timestamps".to_string(),
            "1".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ]);

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());
        args.push(path_arg(&job.manifest_path));
        args
    }

    /// Builds ffmpeg arguments for constant-frame-rate re-encoding.
    fn build_repair_args(&self, job: &RepairJob) -> Vec<String> {
        let mut args: Vec<String> = [
            "-protocol_whitelist",
            "file,http,https,tcp,tls",
            "-allowed_extensions",
            "ALL",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        args.extend(["-i".to_string(), path_arg(&job.source_manifest)]);

        // Drop broken framing and rebuild timestamps
        args.extend(
            [
                "-fflags",
                "+genpts+igndts+discardcorrupt",
                "-err_detect",
                "aggressive",
                "-bsf:a",
                "aac_adtstoasc",
                "-fps_mode",
                "cfr",
                "-vsync",
                "1",
                "-async",
                "1",
                "-shortest",
                "-avoid_negative_ts",
                "make_zero",
                "-reset_timestamps",
                "1",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args.extend(["-r".to_string(), job.fps.to_string()]);

        // Hardware H.264 encode
        args.extend(
            [
                "-c:v",
                "h264_nvenc",
                "-preset",
                "p7",
                "-crf",
                "28",
                "-tune",
                "hq",
                "-profile:v",
                "high",
                "-level",
                "4.1",
                "-c:a",
                "aac",
                "-b:a",
                "128k",
                "-ac",
                "2",
                "-ar",
                "48000",
            ]
            .iter()
            .map(|s| s.to_string()),
        );

        args.extend([
            "-hls_time".to_string(),
            self.config.repair_segment_secs.to_string(),
            "-hls_list_size".to_string(),
            "0".to_string(),
            "-hls_segment_filename".to_string(),
            path_arg(&job.output_dir.join(&job.segment_template)),
            "-hls_flags".to_string(),
            "split_by_time+independent_segments".to_string(),
            "-hls_allow_cache".to_string(),
            "1".to_string(),
            "-hls_segment_type".to_string(),
            "mpegts".to_string(),
            "-hls_base_url".to_string(),
            "./".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ]);

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());
        args.extend(["-y".to_string(), path_arg(&job.output_manifest)]);
        args
    }

    /// Runs ffmpeg to completion under the timeout watchdog.
    async fn run_ffmpeg(
        &self,
        args: &[String],
        manifest: &Path,
    ) -> Result<TranscodeOutcome, TranscodeError> {
        let start = Instant::now();

        if let Some(parent) = manifest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|_| {
                TranscodeError::OutputDirectoryFailed {
                    path: parent.to_path_buf(),
                }
            })?;
        }

        debug!(args = ?args, "Running ffmpeg");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    TranscodeError::Io(e)
                }
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TranscodeError::failed("stderr was not captured", None))?;
        let mut reader = BufReader::new(stderr).lines();

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let result = timeout(timeout_duration, async {
            let mut error_output = String::new();
            while let Ok(Some(line)) = reader.next_line().await {
                error_output.push_str(&line);
                error_output.push('\n');
            }
            let status = child.wait().await?;
            Ok::<(std::process::ExitStatus, String), std::io::Error>((status, error_output))
        })
        .await;

        match result {
            Ok(Ok((status, error_output))) => {
                if !status.success() {
                    return Err(TranscodeError::failed(
                        format!("FFmpeg exited with code: {:?}", status.code()),
                        if error_output.is_empty() {
                            None
                        } else {
                            Some(error_output)
                        },
                    ));
                }
            }
            Ok(Err(e)) => return Err(TranscodeError::Io(e)),
            Err(_) => {
                // Kill the process on timeout
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed out ffmpeg");
                }
                return Err(TranscodeError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        }

        if !tokio::fs::try_exists(manifest).await.unwrap_or(false) {
            return Err(TranscodeError::failed("Playlist not created", None));
        }

        Ok(TranscodeOutcome {
            manifest_path: manifest.to_path_buf(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn check_binary(&self, path: &Path, probe: bool) -> Result<(), TranscodeError> {
        match Command::new(path).arg("-version").output().await {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(TranscodeError::failed(
                format!("{} -version failed", path.display()),
                Some(String::from_utf8_lossy(&output.stderr).to_string()),
            )),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let path = path.to_path_buf();
                Err(if probe {
                    TranscodeError::FfprobeNotFound { path }
                } else {
                    TranscodeError::FfmpegNotFound { path }
                })
            }
            Err(e) => Err(TranscodeError::Io(e)),
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn segment(&self, job: &SegmentJob) -> Result<TranscodeOutcome, TranscodeError> {
        if !tokio::fs::try_exists(&job.input_path).await.unwrap_or(false) {
            return Err(TranscodeError::InputNotFound {
                path: job.input_path.clone(),
            });
        }
        let args = self.build_segment_args(job);
        self.run_ffmpeg(&args, &job.manifest_path).await
    }

    async fn probe_frame_rate(&self, path: &Path) -> Result<u32, TranscodeError> {
        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=avg_frame_rate",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    TranscodeError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(TranscodeError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        // One line per stream; v:0 selects a single one
        parse_frame_rate(stdout.lines().next().unwrap_or(""))
    }

    async fn repair(&self, job: &RepairJob) -> Result<TranscodeOutcome, TranscodeError> {
        if !tokio::fs::try_exists(&job.source_manifest).await.unwrap_or(false) {
            return Err(TranscodeError::InputNotFound {
                path: job.source_manifest.clone(),
            });
        }
        let args = self.build_repair_args(job);
        self.run_ffmpeg(&args, &job.output_manifest).await
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        self.check_binary(&self.config.ffmpeg_path, false).await?;
        self.check_binary(&self.config.ffprobe_path, true).await
    }
}
