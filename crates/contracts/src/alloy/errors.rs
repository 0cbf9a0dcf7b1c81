alloy::sol! {
    /// Custom errors the processors and the escrowed tokens revert with that
    /// the client needs to tell apart.
    #[allow(missing_docs)]
    #[sol(all_derives)]
    interface ProcessorErrors {
        error InvalidSignature();
        error InvalidAccountNonce(address account, uint256 currentNonce);
        error ERC2612ExpiredSignature(uint256 deadline);
        error ERC2612InvalidSigner(address signer, address owner);
        error ERC20InsufficientAllowance(address spender, uint256 allowance, uint256 needed);
        error ERC20InsufficientBalance(address sender, uint256 balance, uint256 needed);
        error OrderNotActive();
        error ExistingOrder();
        error ZeroValue();
        error OrderTooSmall();
        error InvalidPrecision();
        error UnsupportedToken(address token);
        error FeeQuoteExpired();
        error Paused();
    }
}
