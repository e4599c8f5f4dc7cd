use super::{ConvertOptions, Converter, InputFormat};
use crate::config::DEFAULT_PANDOC_PATH;
use crate::error::ConversionError;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::thread;

const MATH_EXTENSIONS: &str =
    "+tex_math_dollars+raw_tex+tex_math_double_backslash+tex_math_single_backslash";

/// Keeps TeX math as literal `$...$` text instead of native equations.
const KEEP_LATEX_MATH_FILTER: &str = r#"
function Math(el)
  if el.mathtype == "InlineMath" then
    return pandoc.Str("$" .. el.text .. "$")
  end
  return pandoc.Str("$$" .. el.text .. "$$")
end
"#;

/// The `pandoc` command line converter.
///
/// The executable is checked with `--version` on first use. When the
/// configured path does not work the default `pandoc` from `PATH` is tried and,
/// if that works, reported through [`Converter::take_corrected_path`].
#[derive(Debug, Default)]
pub struct Pandoc {
    verified: Mutex<Option<String>>,
    corrected: Mutex<Option<String>>,
}

impl Pandoc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verify(path: &str) -> Result<(), ConversionError> {
        let output = Command::new(path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ConversionError::NotFound(path.to_string()),
                _ => ConversionError::Unusable(e.to_string()),
            })?;

        if !output.status.success() {
            return Err(ConversionError::Unusable(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }

    fn executable(&self, configured: &str) -> Result<String, ConversionError> {
        let mut verified = self
            .verified
            .lock()
            .map_err(|e| ConversionError::Unusable(format!("converter lock poisoned: {e}")))?;

        if verified.as_deref() == Some(configured) {
            return Ok(configured.to_string());
        }

        match Self::verify(configured) {
            Ok(()) => {
                *verified = Some(configured.to_string());
                Ok(configured.to_string())
            }
            Err(e) if configured != DEFAULT_PANDOC_PATH => {
                tracing::warn!(
                    "Converter at {configured:?} failed ({e}), falling back to {DEFAULT_PANDOC_PATH:?}"
                );
                Self::verify(DEFAULT_PANDOC_PATH)?;
                *verified = Some(DEFAULT_PANDOC_PATH.to_string());
                if let Ok(mut corrected) = self.corrected.lock() {
                    *corrected = Some(DEFAULT_PANDOC_PATH.to_string());
                }
                Ok(DEFAULT_PANDOC_PATH.to_string())
            }
            Err(e) => Err(e),
        }
    }

    /// Run pandoc with `input` on stdin and return stdout.
    fn run(
        executable: &str,
        args: &[String],
        input: &str,
        options: &ConvertOptions,
    ) -> Result<Vec<u8>, ConversionError> {
        let mut command = Command::new(executable);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &options.working_dir {
            command.current_dir(dir);
        }
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        tracing::debug!("Running {executable} {}", args.join(" "));
        let mut child = command
            .spawn()
            .map_err(|e| ConversionError::Failed(format!("could not start {executable}: {e}")))?;

        // Feed stdin from its own thread so a large document cannot deadlock
        // against a full stdout pipe.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ConversionError::Failed("converter stdin unavailable".to_string()))?;
        let input = input.as_bytes().to_vec();
        let writer = thread::spawn(move || stdin.write_all(&input));

        let output = child
            .wait_with_output()
            .map_err(|e| ConversionError::Failed(e.to_string()))?;
        if let Ok(Err(e)) = writer.join() {
            tracing::debug!("Converter closed stdin early: {e}");
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            tracing::error!("Converter exited with {}: {stderr}", output.status);
            return Err(ConversionError::Failed(if stderr.is_empty() {
                format!("converter exited with {}", output.status)
            } else {
                stderr
            }));
        }
        // Anything on stderr fails the conversion, even with a zero exit.
        if !stderr.is_empty() {
            tracing::error!("Converter reported errors: {stderr}");
            return Err(ConversionError::Failed(stderr));
        }
        if output.stdout.is_empty() {
            return Err(ConversionError::EmptyOutput);
        }
        Ok(output.stdout)
    }

    /// Converter arguments for producing DOCX from `format`.
    pub fn docx_args(
        format: InputFormat,
        options: &ConvertOptions,
        formula_filter: Option<&str>,
    ) -> Vec<String> {
        let reader = match format {
            InputFormat::Markdown => "markdown",
            InputFormat::Html => "html",
        };
        let mut args = vec![
            "-f".to_string(),
            format!("{reader}{MATH_EXTENSIONS}"),
            "-t".to_string(),
            "docx".to_string(),
            "-o".to_string(),
            "-".to_string(),
            "--highlight-style".to_string(),
            "tango".to_string(),
        ];
        if let Some(filter) = formula_filter {
            args.extend(["--lua-filter".to_string(), filter.to_string()]);
        }
        if let Some(reference) = &options.reference_docx {
            args.extend([
                "--reference-doc".to_string(),
                reference.display().to_string(),
            ]);
        }
        for filter in &options.filters {
            let flag = if filter.extension().is_some_and(|ext| ext == "lua") {
                "--lua-filter"
            } else {
                "--filter"
            };
            args.extend([flag.to_string(), filter.display().to_string()]);
        }
        args
    }

    fn html_to_markdown(
        executable: &str,
        html: &str,
        options: &ConvertOptions,
    ) -> Result<String, ConversionError> {
        let args = [
            "-f".to_string(),
            format!("html{MATH_EXTENSIONS}"),
            "-t".to_string(),
            "markdown+tex_math_dollars+raw_tex".to_string(),
            "-o".to_string(),
            "-".to_string(),
            "--wrap".to_string(),
            "none".to_string(),
        ];
        let stdout = Self::run(executable, &args, html, options)?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

impl Converter for Pandoc {
    fn to_docx(
        &self,
        input: &str,
        format: InputFormat,
        options: &ConvertOptions,
    ) -> Result<Vec<u8>, ConversionError> {
        let executable = self.executable(&options.converter_path)?;

        if !options.keep_original_formula {
            let args = Self::docx_args(format, options, None);
            return Self::run(&executable, &args, input, options);
        }

        // Formula preservation goes through Markdown so the filter sees TeX.
        let markdown = match format {
            InputFormat::Html => Self::html_to_markdown(&executable, input, options)?,
            InputFormat::Markdown => input.to_string(),
        };
        let mut filter = tempfile::Builder::new()
            .prefix("pastemd-keep-math")
            .suffix(".lua")
            .tempfile()
            .map_err(|e| ConversionError::Failed(format!("could not write formula filter: {e}")))?;
        filter
            .write_all(KEEP_LATEX_MATH_FILTER.as_bytes())
            .map_err(|e| ConversionError::Failed(format!("could not write formula filter: {e}")))?;

        let filter_path = filter.path().display().to_string();
        let args = Self::docx_args(InputFormat::Markdown, options, Some(&filter_path));
        Self::run(&executable, &args, &markdown, options)
    }

    fn take_corrected_path(&self) -> Option<String> {
        self.corrected.lock().ok().and_then(|mut corrected| corrected.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn markdown_args() {
        let args = Pandoc::docx_args(InputFormat::Markdown, &ConvertOptions::default(), None);
        assert_eq!(args[0], "-f");
        assert!(args[1].starts_with("markdown+tex_math_dollars"));
        assert_eq!(&args[2..6], ["-t", "docx", "-o", "-"]);
        assert!(!args.contains(&"--reference-doc".to_string()));
    }

    #[test]
    fn options_become_flags() {
        let options = ConvertOptions {
            reference_docx: Some(PathBuf::from("/tpl/ref.docx")),
            filters: vec![PathBuf::from("/f/a.lua"), PathBuf::from("/f/b.py")],
            ..ConvertOptions::default()
        };
        let args = Pandoc::docx_args(InputFormat::Html, &options, Some("/tmp/keep.lua"));
        assert!(args[1].starts_with("html+"));
        let joined = args.join(" ");
        assert!(joined.contains("--lua-filter /tmp/keep.lua"));
        assert!(joined.contains("--reference-doc /tpl/ref.docx"));
        assert!(joined.contains("--lua-filter /f/a.lua"));
        assert!(joined.contains("--filter /f/b.py"));
    }

    #[test]
    fn missing_executable_is_not_found() {
        let result = Pandoc::verify("/definitely/not/a/pandoc");
        assert!(matches!(result, Err(ConversionError::NotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn stderr_fails_conversion_despite_zero_exit() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-pandoc");
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             if [ \"$1\" = \"--version\" ]; then echo 'pandoc 3.1'; exit 0; fi\n\
             cat > /dev/null\n\
             echo '[WARNING] Could not fetch resource img.png' >&2\n\
             printf 'PKDOCX'\n\
             exit 0\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let options = ConvertOptions {
            converter_path: script.display().to_string(),
            ..ConvertOptions::default()
        };
        let result = Pandoc::new().to_docx("# Title", InputFormat::Markdown, &options);
        match result {
            Err(ConversionError::Failed(message)) => {
                assert!(message.contains("Could not fetch resource"), "{message}");
            }
            other => panic!("expected a conversion failure, got {other:?}"),
        }
    }
}
