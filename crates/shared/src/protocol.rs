use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("get") {
            Ok(Self::Get)
        } else if s.eq_ignore_ascii_case("post") {
            Ok(Self::Post)
        } else {
            Err(format!("unsupported method '{s}'"))
        }
    }
}

/// An absolute request ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentRequest {
    pub url: String,
    pub method: Method,
    /// Pairs sent as an URL-encoded body.
    pub form: Option<Vec<(String, String)>>,
}

impl FragmentRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            form: None,
        }
    }

    pub fn with_method(url: impl Into<String>, method: Method) -> Self {
        Self {
            url: url.into(),
            method,
            form: None,
        }
    }

    pub fn post_form(url: impl Into<String>, form: Vec<(String, String)>) -> Self {
        Self {
            url: url.into(),
            method: Method::Post,
            form: Some(form),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentResponse {
    pub status: u16,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("post".parse::<Method>(), Ok(Method::Post));
        assert_eq!("GET".parse::<Method>(), Ok(Method::Get));
        assert!("DELETE".parse::<Method>().is_err());
    }

    #[test]
    fn method_serializes_uppercase() {
        let json = serde_json::to_string(&Method::Post).expect("json");
        assert_eq!(json, "\"POST\"");
    }
}
