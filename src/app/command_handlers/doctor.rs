use crate::app::command_support::{access_token, config_path, load_settings, ACCESS_TOKEN_ENV};
use crate::bridge::ProcessBridge;
use crate::config::Settings;
use crate::shared::RuntimeLog;
use crate::translate::ProtocolDoc;

#[derive(Debug, Clone)]
struct DoctorFinding {
    id: String,
    ok: bool,
    detail: String,
    remediation: String,
}

fn doctor_finding(
    id: impl Into<String>,
    ok: bool,
    detail: impl Into<String>,
    remediation: impl Into<String>,
) -> DoctorFinding {
    DoctorFinding {
        id: id.into(),
        ok,
        detail: detail.into(),
        remediation: remediation.into(),
    }
}

fn settings_findings(settings: &Settings) -> Vec<DoctorFinding> {
    let mut findings = Vec::new();

    let binary = settings.bridge.binary.as_str();
    findings.push(doctor_finding(
        "bridge.binary",
        ProcessBridge::new(binary).is_available(),
        format!("binary={binary}"),
        "install the claude CLI or set bridge.binary in the config",
    ));

    if let Some(dir) = settings.bridge.working_directory.as_ref() {
        findings.push(doctor_finding(
            "bridge.working_directory",
            dir.is_dir(),
            format!("path={}", dir.display()),
            "create the directory or fix bridge.working_directory",
        ));
    }

    if let Some(path) = settings.translation.protocol_path.as_ref() {
        findings.push(doctor_finding(
            "translation.protocol",
            path.is_file(),
            format!("path={}", path.display()),
            "fix translation.protocol_path (the built-in protocol is used meanwhile)",
        ));
    }
    let protocol = ProtocolDoc::new(
        settings.translation.protocol_path.clone(),
        RuntimeLog::disabled(),
    );
    findings.push(doctor_finding(
        "translation.protocol_version",
        true,
        format!("version={}", protocol.version()),
        "none",
    ));

    findings
}

pub fn cmd_doctor() -> Result<String, String> {
    let mut findings = Vec::new();
    let config_path = config_path()?;
    findings.push(doctor_finding(
        "config.path",
        true,
        if config_path.exists() {
            format!("config={}", config_path.display())
        } else {
            format!("config={} (missing, using defaults)", config_path.display())
        },
        "none",
    ));

    match load_settings() {
        Ok(settings) => {
            findings.push(doctor_finding(
                "config.parse",
                true,
                "settings parsed and validated",
                "none",
            ));
            findings.extend(settings_findings(&settings));
        }
        Err(err) => findings.push(doctor_finding(
            "config.parse",
            false,
            format!("settings load failed: {err}"),
            format!("fix {} and retry `adegate doctor`", config_path.display()),
        )),
    }

    findings.push(doctor_finding(
        format!("env.{ACCESS_TOKEN_ENV}"),
        access_token().is_some(),
        "required by `adegate ask`",
        format!("export {ACCESS_TOKEN_ENV} with a translation service token"),
    ));

    let failed = findings.iter().filter(|f| !f.ok).count();
    let summary = if failed == 0 { "healthy" } else { "unhealthy" };
    let mut lines = vec![
        format!("summary={summary}"),
        format!("checks_total={}", findings.len()),
        format!("checks_failed={failed}"),
    ];
    for finding in findings {
        lines.push(format!(
            "check:{}={}",
            finding.id,
            if finding.ok { "ok" } else { "fail" }
        ));
        lines.push(format!("check:{}.detail={}", finding.id, finding.detail));
        if !finding.ok {
            lines.push(format!(
                "check:{}.remediation={}",
                finding.id, finding.remediation
            ));
        }
    }
    Ok(lines.join("\n"))
}
