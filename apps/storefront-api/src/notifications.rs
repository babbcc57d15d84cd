//! Customer emails: order confirmation and invoice delivery.
//!
//! Confirmation is a side effect of checkout and runs detached; a failure
//! is logged and never reaches the caller.

use tracing::{info, warn};

use storefront_core::invoice::TaxInvoice;
use storefront_core::{Customer, Money, Order};

use crate::mailer::{Attachment, Email, MailError, Mailer};
use crate::state::AppState;

/// Confirmation mail for a freshly placed order.
pub fn order_confirmation(order: &Order, customer: &Customer, currency_prefix: &str) -> Email {
    let subject = format!("Order #{} confirmed", order.order_id);
    let body = format!(
        "Hi {name},\n\n\
         Thank you for your order #{id}.\n\n\
         Subtotal:  {subtotal}\n\
         GST:       {tax}\n\
         Total:     {total}\n\
         Payment:   {payment}\n\n\
         We will let you know when it ships.\n",
        name = customer.name,
        id = order.order_id,
        subtotal = order.subtotal().format_with(currency_prefix),
        tax = order.total_tax().format_with(currency_prefix),
        total = order.total_price().format_with(currency_prefix),
        payment = order.payment_method.label(),
    );
    Email::new(customer.email.clone(), subject, body)
}

/// `Invoice-<number>.pdf`
pub fn invoice_filename(invoice: &TaxInvoice) -> String {
    format!("Invoice-{}.pdf", invoice.invoice.invoice_number)
}

/// Invoice mail with the rendered PDF attached.
pub fn invoice_email(to: &str, invoice: &TaxInvoice, pdf: Vec<u8>, currency_prefix: &str) -> Email {
    let number = &invoice.invoice.invoice_number;
    let body = format!(
        "Hi {name},\n\n\
         Please find attached tax invoice {number} for order #{order}.\n\
         Amount: {total}\n",
        name = invoice.customer.name,
        number = number,
        order = invoice.invoice.order_id,
        total = Money::from_paise(invoice.summary.total_paise).format_with(currency_prefix),
    );
    Email::new(to, format!("Tax invoice {}", number), body).with_attachment(Attachment {
        filename: invoice_filename(invoice),
        content_type: "application/pdf".to_string(),
        bytes: pdf,
    })
}

/// Looks up the customer and sends the confirmation in the background.
pub fn dispatch_order_confirmation(state: &AppState, order: Order) {
    let db = state.db.clone();
    let mailer = state.mailer.clone();
    let prefix = state.currency_prefix().to_string();

    tokio::spawn(async move {
        match db.users().get(order.user_id).await {
            Ok(customer) => {
                let email = order_confirmation(&order, &customer, &prefix);
                deliver_confirmation(mailer.as_ref(), email, order.order_id).await;
            }
            Err(e) => warn!(order_id = order.order_id, error = %e, "Order confirmation skipped"),
        }
    });
}

/// Sends a confirmation; failure is logged only.
pub async fn deliver_confirmation(mailer: &dyn Mailer, email: Email, order_id: i64) {
    match mailer.send(email).await {
        Ok(()) => info!(order_id, "Order confirmation sent"),
        Err(e) => warn!(order_id, error = %e, "Order confirmation failed"),
    }
}

/// Sends an invoice mail and waits for the result.
pub async fn send_invoice(mailer: &dyn Mailer, email: Email) -> Result<(), MailError> {
    let to = email.to.clone();
    mailer.send(email).await?;
    info!(to = %to, "Invoice emailed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::MemoryMailer;
    use chrono::Utc;
    use storefront_core::{OrderStatus, PaymentMethod};

    fn order() -> Order {
        Order {
            order_id: 17,
            user_id: 3,
            address_id: 5,
            subtotal_paise: 25_000,
            total_tax_paise: 3_850,
            total_price_paise: 28_850,
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::CashOnDelivery,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn customer() -> Customer {
        Customer {
            user_id: 3,
            name: "Ravi".to_string(),
            email: "ravi@example.com".to_string(),
            phone: None,
        }
    }

    #[test]
    fn test_confirmation_contents() {
        let email = order_confirmation(&order(), &customer(), "Rs. ");
        assert_eq!(email.to, "ravi@example.com");
        assert_eq!(email.subject, "Order #17 confirmed");
        assert!(email.text_body.contains("Rs. 288.50"));
        assert!(email.text_body.contains("Cash on Delivery"));
        assert!(email.attachments.is_empty());
    }

    #[tokio::test]
    async fn test_confirmation_delivery() {
        let mailer = MemoryMailer::new();
        let email = order_confirmation(&order(), &customer(), "Rs. ");
        deliver_confirmation(&mailer, email, 17).await;
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_confirmation_failure_is_swallowed() {
        let mailer = MemoryMailer::new();
        let mut bad = customer();
        bad.email = "nobody".to_string();
        deliver_confirmation(&mailer, order_confirmation(&order(), &bad, "Rs. "), 17).await;
        assert!(mailer.sent().is_empty());
    }
}
