// Example demonstrating tokensign as a library
//
// Run with: cargo run --example basic_signing
//
// Note: This example requires a token in a slot and its PIN in TOKENSIGN_PIN.
// The PKCS#11 module comes from TOKENSIGN_PKCS11_MODULE or the platform default.

use tokensign::{api::Pin, Config};

fn main() -> anyhow::Result<()> {
    println!("tokensign Basic Signing Example");
    println!("===============================\n");

    let config = Config::from_env();
    println!("Module: {}\n", config.module_path.display());

    let tokens = tokensign::list_tokens(&config)?;
    let Some(token) = tokens.first() else {
        println!("No token found in any slot.");
        return Ok(());
    };
    println!("Using {}", token);

    let mechanisms = tokensign::list_signing_mechanisms(&config, token.slot_id)?;
    let Some(mechanism) = mechanisms.first() else {
        println!("No usable signing mechanism on this token.");
        return Ok(());
    };
    println!("Mechanism: {}\n", mechanism);

    let pin = Pin::from_str(&std::env::var("TOKENSIGN_PIN")?)?;
    let message = b"Hello, token!";
    println!("Signing message: {:?}", String::from_utf8_lossy(message));
    let signature = tokensign::sign(&config, token.slot_id, mechanism.id, &pin, message)?;
    println!("✓ Message signed");
    println!("  Signature: {}\n", hex::encode(signature.as_bytes()));

    println!("Verifying signature...");
    if tokensign::verify(&config, token.slot_id, mechanism.id, message, signature.as_bytes())? {
        println!("✓ Signature verified successfully!");
    } else {
        println!("✗ Signature verification failed");
    }

    Ok(())
}
