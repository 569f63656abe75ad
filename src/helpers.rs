#[cfg(test)]
pub mod tests {
  use actix_web::{http::StatusCode, HttpRequest, Responder};
  use serde::de::DeserializeOwned;

  pub async fn parse_http_response<T: DeserializeOwned>(
    responder: impl Responder,
    request: &HttpRequest,
    status_code: StatusCode,
  ) -> T {
    // Convert the `Responder` into an HttpResponse
    let http_response = responder.respond_to(request);

    // Wrap the HttpResponse in a ServiceResponse so that test utilities can work with it
    let service_response =
      actix_web::test::TestRequest::default().to_srv_response(http_response);

    let service_status_code = service_response.status();
    let body_bytes = actix_web::test::read_body(service_response).await;
    let body_string = String::from_utf8(body_bytes.to_vec())
      .expect("Response body contains invalid UTF-8");

    assert_eq!(service_status_code, status_code, "body: {}", body_string);

    serde_json::from_str(&body_string)
      .expect("Failed to deserialize response body")
  }
}
