use super::client::ProvisioningClient;
use crate::error::Error;
use crate::models::GroupListData;
use reqwest::Method;

impl ProvisioningClient {
    /// Lists the names of all groups on the server.
    pub async fn get_group_list(&self) -> Result<Vec<String>, Error> {
        let url = self.build_url(&["groups"])?;
        let req = self.request(Method::GET, url);
        let resp = self.send(req).await?;
        let data: GroupListData = self.expect_envelope(resp).await?;
        Ok(data.groups)
    }
}
