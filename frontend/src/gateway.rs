//! Browser `fetch` implementation of the backend contract.

use hierarchy::{ApiRequest, DataGateway, GatewayError, JSONAPI_MIMETYPE, Method};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, RequestMode, Response};

/// Sends [`ApiRequest`]s to the backend at `base_url`. Holds only the URL, so
/// it is cheap to clone into every spawned request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpGateway {
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Self {
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        Self { base_url }
    }

    pub fn url(&self, request: &ApiRequest) -> String {
        let mut url = format!("{}{}", self.base_url, request.path);
        for (index, (key, value)) in request.query.iter().enumerate() {
            url.push(if index == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.push_str(&String::from(js_sys::encode_uri_component(value)));
        }
        url
    }

    fn transport(path: &str, error: impl std::fmt::Debug) -> GatewayError {
        GatewayError::Transport {
            path: path.to_string(),
            message: format!("{error:?}"),
        }
    }

    async fn fetch(&self, request: &ApiRequest) -> Result<String, GatewayError> {
        let path = request.path;
        let headers = Headers::new().map_err(|error| Self::transport(path, error))?;
        headers
            .set("Accept", JSONAPI_MIMETYPE)
            .map_err(|error| Self::transport(path, error))?;

        let opts = RequestInit::new();
        opts.set_mode(RequestMode::Cors);
        match request.method {
            Method::Get => opts.set_method("GET"),
            Method::Post => {
                opts.set_method("POST");
                headers
                    .set("Content-Type", "application/json")
                    .map_err(|error| Self::transport(path, error))?;
                if let Some(body) = &request.body {
                    opts.set_body(&wasm_bindgen::JsValue::from_str(body));
                }
            }
        }
        opts.set_headers(&headers);

        let js_request = Request::new_with_str_and_init(&self.url(request), &opts)
            .map_err(|error| Self::transport(path, error))?;
        let window = web_sys::window().ok_or_else(|| Self::transport(path, "no window"))?;
        let response: Response = JsFuture::from(window.fetch_with_request(&js_request))
            .await
            .map_err(|error| Self::transport(path, error))?
            .dyn_into()
            .map_err(|error| Self::transport(path, error))?;

        if !response.ok() {
            return Err(GatewayError::Status {
                path: path.to_string(),
                status: response.status(),
            });
        }
        let text = response.text().map_err(|error| Self::transport(path, error))?;
        JsFuture::from(text)
            .await
            .map_err(|error| Self::transport(path, error))?
            .as_string()
            .ok_or_else(|| Self::transport(path, "response body is not text"))
    }
}

impl DataGateway for HttpGateway {
    async fn send(&self, request: ApiRequest) -> Result<String, GatewayError> {
        zoon::println!("[GATEWAY] {:?} {}", request.method, request.path);
        self.fetch(&request).await
    }
}
