//! Single-server advertisement protocol
//!
//! One attempt walks these steps, stopping at the first failure:
//!
//! 1. resolve the service name
//! 2. refresh namespace ads from the director
//! 3. pick the base data URL by role and build the payload
//! 4. look up the director endpoint and build `/api/v1.0/director/register<Role>`
//! 5. fetch an advertisement token
//! 6. `POST` the payload and classify the response

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};

use crate::server::ManagedServer;

use super::error::AdvertiseError;
use super::Advertiser;

impl Advertiser {
    /// Advertise one server to the director
    pub async fn advertise_one(&self, server: &dyn ManagedServer) -> Result<(), AdvertiseError> {
        let server_type = server.server_type();
        let _timer = crate::metrics::start_advertise_timer(server_type.as_str());

        let result = self.advertise_steps(server).await;
        crate::metrics::record_advertise_attempt(server_type.as_str(), result.is_ok());
        result
    }

    async fn advertise_steps(&self, server: &dyn ManagedServer) -> Result<(), AdvertiseError> {
        let server_type = server.server_type();

        let name = self
            .names
            .service_name(server_type)
            .await
            .map_err(AdvertiseError::ServiceName)?;

        server
            .refresh_namespace_ads()
            .await
            .map_err(|source| AdvertiseError::NamespaceRefresh { server_type, source })?;

        let data_url = self.config.data_url_for(server_type);
        let web_url = self.config.external_web_url();

        let ad = server
            .create_advertisement(&name, &data_url, &web_url)
            .map_err(|source| AdvertiseError::CreateAdvertisement { server_type, source })?;

        let body = serde_json::to_vec(&ad)
            .map_err(|source| AdvertiseError::Serialize { server_type, source })?;

        let fed_info = self
            .federation
            .federation_info()
            .await
            .map_err(AdvertiseError::Federation)?;

        if fed_info.director_endpoint.is_empty() {
            return Err(AdvertiseError::DirectorUnknown);
        }

        let mut director_url =
            url::Url::parse(&fed_info.director_endpoint).map_err(AdvertiseError::InvalidDirectorUrl)?;
        director_url.set_path(&server_type.registration_path());

        let token = self
            .tokens
            .advertisement_token(server)
            .await
            .map_err(AdvertiseError::Token)?;

        tracing::debug!(
            server_type = %server_type,
            name = %name,
            url = %director_url,
            namespaces = ad.namespaces.len(),
            "Sending advertisement to director"
        );

        let response = self
            .http_client
            .post(director_url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(USER_AGENT, server_type.user_agent(&self.config.version()))
            .body(body)
            .send()
            .await
            .map_err(AdvertiseError::Send)?;

        let status = response.status().as_u16();

        // Drain the body before judging the status; error bodies are diagnostic.
        let body = response.bytes().await.map_err(AdvertiseError::ReadBody)?;

        if status > 299 {
            return Err(AdvertiseError::from_director_response(status, &body));
        }

        Ok(())
    }
}
