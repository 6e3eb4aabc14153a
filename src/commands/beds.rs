use anyhow::{Context, Result};

use wardbeds::availability::render::{render_bed_table, render_booked_list};
use wardbeds::availability::{BookingForm, FormField};
use wardbeds::config::Config;
use wardbeds::error::{Error, ErrorCategory, WardbedsErrorTrait};
use wardbeds::registry::{BedRegistry, RegistryError};

use super::{build_client, connect};

/// Registry failure as the user should read it
fn registry_failure(err: RegistryError) -> anyhow::Error {
    let err = Error::from(err);
    match err.category() {
        ErrorCategory::Auth => anyhow::anyhow!("Session expired, please log in again"),
        _ => anyhow::anyhow!(err.user_message()),
    }
}

pub async fn initialize(config: &Config) -> Result<()> {
    let session = connect(config).await?;
    let client = session.client();

    client
        .initialize()
        .await
        .context("Failed to initialize beds. Please try again.")?;
    let stats = client.get_stats().await.context("Failed to fetch bed stats")?;

    println!("Beds initialized successfully ({} beds)", stats.total);
    Ok(())
}

pub async fn list(config: &Config) -> Result<()> {
    let session = connect(config).await?;
    let beds = session
        .client()
        .get_all()
        .await
        .context("Failed to fetch beds")?;

    print!("{}", render_bed_table(&beds));
    Ok(())
}

pub async fn available(config: &Config) -> Result<()> {
    let session = connect(config).await?;
    let beds = session
        .client()
        .get_available()
        .await
        .context("Failed to fetch available beds")?;

    if beds.is_empty() {
        println!("No beds are currently available");
        return Ok(());
    }
    print!("{}", render_bed_table(&beds));
    Ok(())
}

pub async fn booked(config: &Config) -> Result<()> {
    let session = connect(config).await?;
    let beds = session
        .client()
        .get_booked()
        .await
        .context("Failed to fetch booked beds")?;

    print!("{}", render_booked_list(beds.iter()));
    Ok(())
}

pub async fn stats(config: &Config) -> Result<()> {
    let session = connect(config).await?;
    let stats = session
        .client()
        .get_stats()
        .await
        .context("Failed to fetch bed stats")?;

    println!("Bed Statistics");
    println!("==============");
    println!("  Total:     {}", stats.total);
    println!("  Available: {}", stats.available);
    println!("  Booked:    {}", stats.booked);
    println!("  Occupancy: {:.1}%", stats.occupancy());
    Ok(())
}

pub async fn book(config: &Config, id: u32, patient: String, time: String) -> Result<()> {
    // Validate before touching the registry
    let mut form = BookingForm::default();
    form.set(FormField::PatientName, patient);
    form.set(FormField::Time, time);
    let request = form.validate()?;

    let session = connect(config).await?;
    let bed = session
        .client()
        .book(id, &request)
        .await
        .map_err(registry_failure)
        .context("Failed to book bed")?;

    println!(
        "Bed {} booked successfully for {}",
        bed.id, request.patient_name
    );
    Ok(())
}

pub async fn unbook(config: &Config, id: u32) -> Result<()> {
    let session = connect(config).await?;
    let bed = session
        .client()
        .unbook(id)
        .await
        .map_err(registry_failure)
        .context("Failed to unbook bed")?;

    println!("Bed {} unbooked successfully", bed.id);
    Ok(())
}

pub async fn login(config: &Config) -> Result<()> {
    let (Some(email), Some(password)) = (&config.registry.email, &config.registry.password)
    else {
        anyhow::bail!("Set WARDBEDS_EMAIL and WARDBEDS_PASSWORD (or --email/--password) to log in");
    };

    let client = build_client(config)?;
    let response = client
        .login(email, password)
        .await
        .with_context(|| format!("Login failed for {email}"))?;

    let profile = client.profile().await.context("Failed to fetch profile")?;

    println!("Logged in as {}", profile.email);
    println!("export WARDBEDS_TOKEN={}", response.token);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_failure_messages() {
        let err = registry_failure(RegistryError::Unauthorized);
        assert_eq!(err.to_string(), "Session expired, please log in again");

        let err = registry_failure(RegistryError::Rejected {
            status: 409,
            message: "Bed 4 is already booked".to_string(),
        });
        assert_eq!(err.to_string(), "Bed 4 is already booked");

        let err = registry_failure(RegistryError::NotFound(99));
        assert_eq!(err.to_string(), "Bed 99 not found");
    }
}
